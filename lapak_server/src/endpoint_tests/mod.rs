mod group_buys;
mod helpers;
mod internal;
mod mocks;
mod payments;
