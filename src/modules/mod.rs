pub mod crawler;
pub mod forms;
pub mod prober;
pub mod recon;
