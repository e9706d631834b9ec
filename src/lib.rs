pub mod bitvector;
pub mod decoder;
pub mod error;
pub mod il;
pub mod instructions;
pub mod memory;
pub mod reg;
pub mod session;

pub mod isa {
    pub mod sh4; // SuperH-4 integer core
}

pub use bitvector::BitVector;
pub use decoder::{Decoder, Mnemonic, Param, Scaling, ShOp};
pub use error::{BindingError, LiftError, ProfileError, SyncError, VmError};
pub use il::{Effect, Lifted, Pure};
pub use memory::{Bus, LinearMemory};
pub use reg::{RegProfile, RegisterBinding, RegisterFile};
pub use session::{Session, Trap};
