pub mod list;
pub mod recall;
pub mod sheet;
pub mod watch;
