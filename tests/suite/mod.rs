mod cli;
mod client;
mod config;
