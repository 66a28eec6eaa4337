mod common;
mod replication;
mod scenario;
