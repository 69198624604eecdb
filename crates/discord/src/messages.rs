use serde::Serialize;

use motorpool_core::domain::vehicle::VALID_STATES;

pub const COLOR_BLURPLE: u32 = 0x5865F2;
pub const COLOR_GREEN: u32 = 0x57F287;
pub const COLOR_RED: u32 = 0xED4245;
pub const COLOR_YELLOW: u32 = 0xFEE75C;

pub const SELECT_VEHICLE_ID: &str = "vehicle.select.v1";
pub const SELECT_STATE_ID: &str = "vehicle.state.v1";
pub const PAGE_PREV_ID: &str = "vehicle.page.prev.v1";
pub const PAGE_NEXT_ID: &str = "vehicle.page.next.v1";

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Embed {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub fields: Vec<EmbedField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footer: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ButtonStyle {
    Primary,
    Secondary,
    Danger,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Button {
    pub custom_id: String,
    pub label: String,
    pub style: ButtonStyle,
    pub disabled: bool,
}

impl Button {
    pub fn new(custom_id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            custom_id: custom_id.into(),
            label: label.into(),
            style: ButtonStyle::Secondary,
            disabled: false,
        }
    }

    pub fn style(mut self, style: ButtonStyle) -> Self {
        self.style = style;
        self
    }

    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SelectOption {
    pub label: String,
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl SelectOption {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self { label: label.into(), value: value.into(), description: None }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SelectMenu {
    pub custom_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    pub options: Vec<SelectOption>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Component {
    Button(Button),
    SelectMenu(SelectMenu),
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ActionRow {
    pub components: Vec<Component>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct MessageTemplate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub embeds: Vec<Embed>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub components: Vec<ActionRow>,
}

impl MessageTemplate {
    /// All human-readable text in the template, joined for log lines and
    /// assertions; layout is not preserved.
    pub fn text_content(&self) -> String {
        let mut parts: Vec<&str> = Vec::new();
        if let Some(content) = &self.content {
            parts.push(content);
        }
        for embed in &self.embeds {
            if let Some(title) = &embed.title {
                parts.push(title);
            }
            if let Some(description) = &embed.description {
                parts.push(description);
            }
            for field in &embed.fields {
                parts.push(&field.name);
                parts.push(&field.value);
            }
            if let Some(footer) = &embed.footer {
                parts.push(footer);
            }
        }
        parts.join("\n")
    }
}

pub struct MessageBuilder {
    template: MessageTemplate,
}

impl MessageBuilder {
    pub fn new() -> Self {
        Self { template: MessageTemplate::default() }
    }

    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.template.content = Some(content.into());
        self
    }

    pub fn embed<F>(mut self, build: F) -> Self
    where
        F: FnOnce(&mut EmbedBuilder),
    {
        let mut builder = EmbedBuilder::default();
        build(&mut builder);
        self.template.embeds.push(builder.build());
        self
    }

    pub fn action_row<F>(mut self, build: F) -> Self
    where
        F: FnOnce(&mut ActionRowBuilder),
    {
        let mut builder = ActionRowBuilder::default();
        build(&mut builder);
        self.template.components.push(builder.build());
        self
    }

    pub fn build(self) -> MessageTemplate {
        self.template
    }
}

impl Default for MessageBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Default)]
pub struct EmbedBuilder {
    embed: Embed,
}

impl EmbedBuilder {
    pub fn title(&mut self, title: impl Into<String>) -> &mut Self {
        self.embed.title = Some(title.into());
        self
    }

    pub fn description(&mut self, description: impl Into<String>) -> &mut Self {
        self.embed.description = Some(description.into());
        self
    }

    pub fn color(&mut self, color: u32) -> &mut Self {
        self.embed.color = Some(color);
        self
    }

    pub fn field(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.embed.fields.push(EmbedField { name: name.into(), value: value.into(), inline: false });
        self
    }

    pub fn footer(&mut self, footer: impl Into<String>) -> &mut Self {
        self.embed.footer = Some(footer.into());
        self
    }

    fn build(self) -> Embed {
        self.embed
    }
}

#[derive(Default)]
pub struct ActionRowBuilder {
    components: Vec<Component>,
}

impl ActionRowBuilder {
    pub fn button(&mut self, button: Button) -> &mut Self {
        self.components.push(Component::Button(button));
        self
    }

    pub fn select_menu(&mut self, menu: SelectMenu) -> &mut Self {
        self.components.push(Component::SelectMenu(menu));
        self
    }

    fn build(self) -> ActionRow {
        ActionRow { components: self.components }
    }
}

pub fn success_message(text: &str) -> MessageTemplate {
    MessageBuilder::new()
        .embed(|embed| {
            embed.description(format!("✅ {text}")).color(COLOR_GREEN);
        })
        .build()
}

pub fn error_message(text: &str, correlation_id: &str) -> MessageTemplate {
    MessageBuilder::new()
        .embed(|embed| {
            embed
                .description(format!("⚠️ {text}"))
                .color(COLOR_RED)
                .footer(format!("ref: {correlation_id}"));
        })
        .build()
}

pub fn permission_denied_message(action: &str) -> MessageTemplate {
    MessageBuilder::new()
        .embed(|embed| {
            embed.description(format!("❌ You don't have permission to {action}.")).color(COLOR_RED);
        })
        .build()
}

pub fn invalid_state_message(given: &str) -> MessageTemplate {
    let valid = VALID_STATES.join("`, `");
    MessageBuilder::new()
        .embed(|embed| {
            embed
                .description(format!("⚠️ `{given}` is not a vehicle state. Choose one of `{valid}`."))
                .color(COLOR_YELLOW);
        })
        .build()
}

pub fn busy_message() -> MessageTemplate {
    MessageBuilder::new()
        .embed(|embed| {
            embed
                .description("⏳ The vehicle list is being updated. Try again in a moment.")
                .color(COLOR_YELLOW);
        })
        .build()
}

/// Second step of the interactive flow: pick the state to apply to the
/// vehicle chosen from the listing.
pub fn state_select_message(plate: &str) -> MessageTemplate {
    MessageBuilder::new()
        .content(format!("Select a new state for `{plate}`."))
        .action_row(|row| {
            row.select_menu(SelectMenu {
                custom_id: SELECT_STATE_ID.to_owned(),
                placeholder: Some("Choose a state".to_owned()),
                options: vec![
                    SelectOption::new("Stored", "stored").description("Parked in the garage"),
                    SelectOption::new("Checked out", "checked-out").description("Out on the road"),
                ],
            });
        })
        .build()
}

pub fn help_message() -> MessageTemplate {
    MessageBuilder::new()
        .embed(|embed| {
            embed
                .title("Vehicle commands")
                .color(COLOR_BLURPLE)
                .field("/vehicle add <plate> <owner>", "Register a vehicle (admin only)")
                .field("/vehicle remove <plate>", "Remove a vehicle (admin only)")
                .field("/vehicle state <plate> <stored|checked-out>", "Change a vehicle's state")
                .field("/vehicle visibility <plate> <public|private>", "Toggle who may change it")
                .field("/vehicle list", "Post or refresh the garage listing")
                .field("/vehicle help", "Show this message");
        })
        .build()
}

#[cfg(test)]
mod tests {
    use super::{
        help_message, invalid_state_message, Button, ButtonStyle, Component, MessageBuilder,
        SelectMenu, SelectOption,
    };

    #[test]
    fn builder_preserves_block_order() {
        let template = MessageBuilder::new()
            .content("heads up")
            .embed(|embed| {
                embed.title("Garage").field("one", "1");
            })
            .action_row(|row| {
                row.button(Button::new("b-1", "Prev").style(ButtonStyle::Primary));
            })
            .build();

        assert_eq!(template.content.as_deref(), Some("heads up"));
        assert_eq!(template.embeds.len(), 1);
        assert_eq!(template.components.len(), 1);
        assert!(matches!(
            template.components[0].components[0],
            Component::Button(ref button) if button.custom_id == "b-1"
        ));
    }

    #[test]
    fn select_menu_serializes_with_type_tag() {
        let menu = Component::SelectMenu(SelectMenu {
            custom_id: "vehicle.select.v1".to_owned(),
            placeholder: Some("Pick a vehicle".to_owned()),
            options: vec![SelectOption::new("AB-123-CD", "AB-123-CD")],
        });

        let json = serde_json::to_value(&menu).expect("serialize");
        assert_eq!(json["type"], "select_menu");
        assert_eq!(json["custom_id"], "vehicle.select.v1");
        assert_eq!(json["options"][0]["value"], "AB-123-CD");
    }

    #[test]
    fn invalid_state_reply_lists_the_valid_values() {
        let text = invalid_state_message("parked").text_content();
        assert!(text.contains("`parked`"));
        assert!(text.contains("stored"));
        assert!(text.contains("checked-out"));
    }

    #[test]
    fn help_covers_every_verb() {
        let text = help_message().text_content();
        for verb in ["add", "remove", "state", "visibility", "list", "help"] {
            assert!(text.contains(verb), "help should mention `{verb}`");
        }
    }
}
