pub mod bgp;
pub mod rov;
