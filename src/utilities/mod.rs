// -- mod.rs --

mod ring;
pub use ring::Ring;
