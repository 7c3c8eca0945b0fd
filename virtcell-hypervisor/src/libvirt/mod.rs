//! Libvirt transport.
//!
//! Only compiled with the `libvirt` feature, which requires the system
//! libvirt libraries at build time.

#[cfg(feature = "libvirt")]
mod backend;

#[cfg(feature = "libvirt")]
pub use backend::LibvirtTransport;
