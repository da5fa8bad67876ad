//! Data-fetching collaborators
//!
//! These sit upstream of the backtest core: they turn exchange/market-data
//! HTTP APIs into a close-price [`Panel`](crate::panel::Panel) and know
//! nothing about the simulation. All fetchers are stateless functions over a
//! shared `reqwest::Client`.

pub mod binance;
pub mod moex;
