//! # Equipment Interface
//!
//! This module defines the interface structures which are reported by equipment controllers.

// -----------------------------------------------------------------------------------------------
// MODULES
// -----------------------------------------------------------------------------------------------

pub mod lwscs;
