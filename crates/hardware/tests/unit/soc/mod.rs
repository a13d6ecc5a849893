//! SoC component tests.




/// Packet construction and response conversion.
pub mod packet;
