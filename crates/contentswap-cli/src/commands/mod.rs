pub mod history;
pub mod init;
pub mod promote;
pub mod recreate;
