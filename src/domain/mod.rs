//! Side-effect free checkout rules. Everything here is plain data in, plain
//! data out; the services in `crate::services` own the transaction.

pub mod assembler;
pub mod discount;
pub mod order_status;
pub mod payment_methods;
pub mod snapshot;
