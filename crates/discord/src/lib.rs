//! Discord integration - gateway bot interface
//!
//! This crate provides the Discord interface for motorpool:
//! - **Gateway** (`gateway`) - event-stream connection behind a transport trait
//! - **Slash Commands** (`commands`) - `/vehicle add`, `/vehicle state`, etc.
//! - **Events** (`events`) - command and component-interaction dispatch
//! - **Messages** (`messages`) - embed and component builders
//! - **Listing** (`listing`) - the shared paginated garage view
//! - **Flows** (`flows`) - the two-step vehicle/state selection machine
//!
//! # Getting Started
//!
//! 1. Create an application in the Discord developer portal
//! 2. Add a bot user and copy its token
//! 3. Register the `/vehicle` command for your guild
//! 4. Set env var: `MOTORPOOL_DISCORD_BOT_TOKEN` (or `DISCORD_TOKEN`)
//!
//! # Architecture
//!
//! ```text
//! Gateway Events → EventDispatcher → Handlers → GarageService → Store
//!                      ↓
//!                Embeds/Components ← Response
//! ```
//!
//! # Key Types
//!
//! - `GatewayRunner` - gateway event loop with reconnection logic
//! - `EventDispatcher` - routes events to appropriate handlers
//! - `MessageBuilder` - constructs embed/component messages
//! - `GarageCommandService` - trait for command handlers

pub mod api;
pub mod commands;
pub mod events;
pub mod flows;
pub mod gateway;
pub mod listing;
pub mod locks;
pub mod messages;
pub mod presence;
pub mod service;
