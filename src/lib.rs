pub mod appsettings;
pub mod command;
pub mod delivery;
pub mod handler;
pub mod identity;
pub mod reminder;
pub mod storage;
pub mod telegram;
pub mod time_resolver;
pub mod watcher;

#[cfg(test)]
mod test_utils;
