pub mod catalog;
pub mod config_loader;
pub mod discovery;
pub mod entry;
pub mod fingerprint;
pub mod flow;
pub mod options;
pub mod preview;
pub mod speech;
pub mod wav;
