// Hashing, addresses and signature containers
//
// Signing and key management live outside this crate; signatures are only
// carried as opaque fixed-size values.

pub mod address;
pub mod hash;
pub mod sig;

pub use address::Address;
pub use hash::Hash;
pub use sig::Sig;
