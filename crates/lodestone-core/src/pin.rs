//! Pinning reasons for immovable nodes.
//!
//! A node can be held in place for several independent reasons at once: the
//! host pins it explicitly, a drag gesture holds it, or the pointer hovers
//! over it. Each reason is a separate flag so that releasing one (for
//! example ending a drag) never releases the others.

use bitflags::bitflags;

bitflags! {
    /// Set of reasons a node is pinned.
    ///
    /// A node is fixed when any flag is set.
    ///
    /// # Examples
    ///
    /// ```
    /// # use lodestone_core::pin::Pins;
    /// let mut pins = Pins::USER | Pins::DRAG;
    /// pins.remove(Pins::DRAG);
    /// assert!(pins.is_pinned());
    ///
    /// pins.remove(Pins::USER);
    /// assert!(!pins.is_pinned());
    /// ```
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct Pins: u8 {
        /// Pinned by the host application.
        const USER  = 0b0000_0001;
        /// Held by an active drag gesture.
        const DRAG  = 0b0000_0010;
        /// Held while the pointer hovers over the node.
        const HOVER = 0b0000_0100;
    }
}

impl Pins {
    /// Returns true if any pin reason is active
    pub fn is_pinned(self) -> bool {
        !self.is_empty()
    }
}

impl From<bool> for Pins {
    /// Maps a plain `fixed` flag onto [`Pins::USER`].
    fn from(fixed: bool) -> Self {
        if fixed { Pins::USER } else { Pins::empty() }
    }
}
