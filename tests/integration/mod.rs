//! End-to-end tests of guild sessions driven through the public handle API

mod connect;
mod recovery;
mod session;
