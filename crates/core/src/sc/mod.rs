pub mod cryxml;
pub mod fingerprint;
pub mod install;
pub mod output;
pub mod p4k;
pub mod profiles;
