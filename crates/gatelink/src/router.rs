//! Dispatch router: hands each decoded event to the matching
//! [`EventHandler`] method.

use gatelink_protocol::DispatchEvent;
use tracing::debug;

use crate::{CommandTable, Context, EventHandler};

pub(crate) struct Router<H> {
    pub(crate) handler: H,
    pub(crate) commands: CommandTable,
}

impl<H: EventHandler> Router<H> {
    pub(crate) fn new(handler: H, commands: CommandTable) -> Self {
        Self { handler, commands }
    }

    /// Invokes the handler for one event. The event is only borrowed;
    /// it is dropped by the caller once this returns.
    pub(crate) fn route(&mut self, ctx: &Context, event: &DispatchEvent) {
        let h = &mut self.handler;
        match event {
            DispatchEvent::Ready(ready) => h.on_ready(ctx, ready),
            DispatchEvent::Resumed => h.on_resumed(ctx),
            DispatchEvent::MessageCreate(msg) => {
                let handled = !self.commands.is_empty() && self.commands.dispatch(ctx, msg);
                if !handled {
                    h.on_message_create(ctx, msg);
                }
            }
            DispatchEvent::MessageUpdate(msg) => h.on_message_update(ctx, msg),
            DispatchEvent::MessageDelete(e) => h.on_message_delete(ctx, e),
            DispatchEvent::MessageDeleteBulk(e) => h.on_message_delete_bulk(ctx, e),
            DispatchEvent::MessageReactionAdd(e) => h.on_reaction_add(ctx, e),
            DispatchEvent::MessageReactionRemove(e) => h.on_reaction_remove(ctx, e),
            DispatchEvent::MessageReactionRemoveAll(e) => h.on_reaction_remove_all(ctx, e),
            DispatchEvent::MessageReactionRemoveEmoji(e) => h.on_reaction_remove_emoji(ctx, e),
            DispatchEvent::GuildMemberAdd(e) => h.on_guild_member_add(ctx, e),
            DispatchEvent::GuildMemberUpdate(e) => h.on_guild_member_update(ctx, e),
            DispatchEvent::GuildMemberRemove(e) => h.on_guild_member_remove(ctx, e),
            DispatchEvent::Unimplemented(name) => {
                debug!(event = name, "no handler for event, ignoring");
            }
        }
    }
}
