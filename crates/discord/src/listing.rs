use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::Mutex;

use motorpool_core::domain::vehicle::Vehicle;

use crate::api::{ChannelId, ChatApi, ChatApiError, MessageRef};
use crate::locks::LockManager;
use crate::messages::{
    Button, ButtonStyle, MessageBuilder, MessageTemplate, SelectMenu, SelectOption, COLOR_BLURPLE,
    PAGE_NEXT_ID, PAGE_PREV_ID, SELECT_VEHICLE_ID,
};

/// The one listing message the bot owns in a channel. Created lazily on the
/// first render; the slot is the only place the message reference lives, and
/// it is handed to the renderer explicitly rather than kept as global state.
pub struct ListingHandle {
    channel: ChannelId,
    slot: Mutex<Option<MessageRef>>,
}

impl ListingHandle {
    pub fn new(channel: ChannelId) -> Self {
        Self { channel, slot: Mutex::new(None) }
    }

    pub fn channel(&self) -> &ChannelId {
        &self.channel
    }

    /// Lock key for the view. There is one listing per channel, so the
    /// channel id stays stable across message recreation.
    pub fn view_key(&self) -> &str {
        self.channel.as_str()
    }

    pub async fn current(&self) -> Option<MessageRef> {
        self.slot.lock().await.clone()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PageTurn {
    Prev,
    Next,
}

#[derive(Debug, Error)]
pub enum ListingError {
    #[error("the vehicle list is busy; try again shortly")]
    Busy,
    #[error(transparent)]
    Api(#[from] ChatApiError),
}

pub struct ListingRenderer {
    api: Arc<dyn ChatApi>,
    handle: Arc<ListingHandle>,
    locks: LockManager,
    page: AtomicUsize,
    page_size: usize,
    lock_timeout: Duration,
}

impl ListingRenderer {
    pub fn new(
        api: Arc<dyn ChatApi>,
        handle: Arc<ListingHandle>,
        page_size: usize,
        lock_timeout: Duration,
    ) -> Self {
        Self {
            api,
            handle,
            locks: LockManager::new(),
            page: AtomicUsize::new(0),
            page_size,
            lock_timeout,
        }
    }

    pub fn handle(&self) -> &Arc<ListingHandle> {
        &self.handle
    }

    /// Re-renders the current page from a fresh snapshot of the records.
    pub async fn refresh(&self, vehicles: &[Vehicle]) -> Result<(), ListingError> {
        let _guard = self
            .locks
            .acquire(self.handle.view_key(), self.lock_timeout)
            .await
            .ok_or(ListingError::Busy)?;

        let page = self.clamped_page(vehicles.len());
        self.page.store(page, Ordering::SeqCst);
        self.push(render_listing_page(vehicles, page, self.page_size)).await
    }

    pub async fn turn_page(
        &self,
        vehicles: &[Vehicle],
        turn: PageTurn,
    ) -> Result<(), ListingError> {
        let _guard = self
            .locks
            .acquire(self.handle.view_key(), self.lock_timeout)
            .await
            .ok_or(ListingError::Busy)?;

        let pages = page_count(vehicles.len(), self.page_size);
        let current = self.clamped_page(vehicles.len());
        let next = match turn {
            PageTurn::Prev => current.saturating_sub(1),
            PageTurn::Next => (current + 1).min(pages - 1),
        };
        self.page.store(next, Ordering::SeqCst);

        self.push(render_listing_page(vehicles, next, self.page_size)).await
    }

    fn clamped_page(&self, total: usize) -> usize {
        self.page.load(Ordering::SeqCst).min(page_count(total, self.page_size) - 1)
    }

    /// Edits the existing message, recreating it in the same channel when the
    /// edit reports that the message no longer exists.
    async fn push(&self, template: MessageTemplate) -> Result<(), ListingError> {
        let mut slot = self.handle.slot.lock().await;

        match slot.as_ref() {
            Some(message) => match self.api.edit_message(message, &template).await {
                Ok(()) => Ok(()),
                Err(ChatApiError::NotFound(_)) => {
                    tracing::info!(
                        event_name = "listing.view.recreated",
                        channel_id = %self.handle.channel.as_str(),
                        "listing message was deleted out-of-band; recreating"
                    );
                    let created = self.api.send_message(&self.handle.channel, &template).await?;
                    *slot = Some(created);
                    Ok(())
                }
                Err(error) => Err(error.into()),
            },
            None => {
                let created = self.api.send_message(&self.handle.channel, &template).await?;
                *slot = Some(created);
                Ok(())
            }
        }
    }
}

pub fn page_count(total: usize, page_size: usize) -> usize {
    total.div_ceil(page_size.max(1)).max(1)
}

pub fn render_listing_page(vehicles: &[Vehicle], page: usize, page_size: usize) -> MessageTemplate {
    let pages = page_count(vehicles.len(), page_size);
    let page = page.min(pages - 1);
    let start = page * page_size;
    let visible = &vehicles[start.min(vehicles.len())..(start + page_size).min(vehicles.len())];

    let mut builder = MessageBuilder::new().embed(|embed| {
        embed.title("Garage vehicles").color(COLOR_BLURPLE);

        if vehicles.is_empty() {
            embed.description("No vehicles registered yet.");
        } else {
            for vehicle in visible {
                let mut value = format!(
                    "Owner: {}\nState: `{}`",
                    vehicle.owner_name,
                    vehicle.state.as_str()
                );
                if vehicle.public {
                    value.push_str("\nVisibility: public");
                }
                embed.field(
                    format!("{} `{}`", vehicle.state.marker(), vehicle.plate),
                    value,
                );
            }
        }

        embed.footer(format!(
            "Page {}/{} · {} vehicle(s)",
            page + 1,
            pages,
            vehicles.len()
        ));
    });

    if !vehicles.is_empty() {
        let options = visible
            .iter()
            .map(|vehicle| {
                SelectOption::new(vehicle.plate.to_string(), vehicle.plate.to_string())
                    .description(format!("Owner: {}", vehicle.owner_name))
            })
            .collect();

        builder = builder
            .action_row(|row| {
                row.select_menu(SelectMenu {
                    custom_id: SELECT_VEHICLE_ID.to_owned(),
                    placeholder: Some("Choose a vehicle".to_owned()),
                    options,
                });
            })
            .action_row(|row| {
                row.button(
                    Button::new(PAGE_PREV_ID, "◀ Prev")
                        .style(ButtonStyle::Primary)
                        .disabled(page == 0),
                )
                .button(
                    Button::new(PAGE_NEXT_ID, "Next ▶")
                        .style(ButtonStyle::Primary)
                        .disabled(page + 1 == pages),
                );
            });
    }

    builder.build()
}
