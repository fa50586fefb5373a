//! Slack Integration - Socket Mode bot interface
//!
//! This crate provides the Slack interface for kudos:
//! - **Socket Mode** (`socket`) - WebSocket connection to Slack (no public URL needed)
//! - **Slash Commands** (`commands`) - `/kudos`, `/stats`
//! - **Mentions** (`mentions`) - resolves `@` mentions against the workspace directory
//! - **Orchestrator** (`service`) - quota gate, praise recording, standings
//! - **Collaborators** (`api`) - directory and chat clients behind traits
//! - **Block Kit** (`blocks`) - rich message builders
//!
//! # Getting Started
//!
//! 1. Create a Slack app at https://api.slack.com/apps
//! 2. Enable Socket Mode and subscribe to slash command events
//! 3. Add slash commands: `/kudos`, `/stats`
//! 4. Set env vars: `KUDOS_SLACK_APP_TOKEN`, `KUDOS_SLACK_BOT_TOKEN`
//!
//! # Architecture
//!
//! ```text
//! Slack Events → EventDispatcher → SlashCommandHandler → PraiseService → Ledger Store
//!                    ↓
//!              Block Kit UI ← Response
//! ```

pub mod api;
pub mod blocks;
pub mod commands;
pub mod events;
pub mod mentions;
pub mod service;
pub mod socket;
