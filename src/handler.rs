use crate::address::{is_admin, recipient_identifier};
use crate::config::Config;
use crate::directive::{build_admin_report, parse_directives, upsert_directive, DirectiveError};
use crate::err::Error;
use crate::message::InboundMessage;
use crate::reply::ReplyCleaner;
use crate::send::{Mailer, OutgoingMail};
use crate::store::SubscriberStore;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum HandlerKind {
    Admin,
    Update,
}

impl FromStr for HandlerKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().trim() {
            "admin" => Ok(HandlerKind::Admin),
            "update" => Ok(HandlerKind::Update),
            other => Err(format!("unknown handler {:?}, expected admin or update", other)),
        }
    }
}

impl fmt::Display for HandlerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            HandlerKind::Admin => "admin",
            HandlerKind::Update => "update",
        })
    }
}

#[derive(Debug, Eq, PartialEq)]
pub enum AdminOutcome {
    Ignored,
    Applied {
        applied: usize,
        failures: Vec<DirectiveError>,
    },
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct UpdateMessage {
    pub key: String,
    pub cleaned: String,
}

#[derive(Debug, Eq, PartialEq)]
pub enum Outcome {
    Admin(AdminOutcome),
    Update(UpdateMessage),
}

pub struct Context<'a> {
    config: &'a Config,
    store: &'a dyn SubscriberStore,
    mailer: &'a dyn Mailer,
    cleaner: ReplyCleaner,
}

impl<'a> Context<'a> {
    pub fn new(
        config: &'a Config,
        store: &'a dyn SubscriberStore,
        mailer: &'a dyn Mailer,
    ) -> Context<'a> {
        Context {
            config,
            store,
            mailer,
            cleaner: ReplyCleaner::new(&config.appname),
        }
    }
}

pub fn handle(ctx: &Context, kind: HandlerKind, mail: &[u8]) -> Result<Outcome, Error> {
    let message = InboundMessage::parse(mail)?;
    match kind {
        HandlerKind::Admin => {
            handle_admin_message(ctx, &message.sender, &message.body).map(Outcome::Admin)
        }
        HandlerKind::Update => {
            handle_update_message(ctx, &message.recipient, &message.body).map(Outcome::Update)
        }
    }
}

/// Applies an administrator's subscription lines and mails them the resulting subscriber list.
#[tracing::instrument(name = "admin message", skip(ctx, body))]
pub fn handle_admin_message(ctx: &Context, sender: &str, body: &str) -> Result<AdminOutcome, Error> {
    if !is_admin(&ctx.config.admins, sender) {
        tracing::info!("Ignoring admin request from non-admin {}", sender);
        return Ok(AdminOutcome::Ignored);
    }

    let mut applied = 0;
    let mut failures = Vec::new();
    for directive in parse_directives(body) {
        match directive {
            Ok(directive) => {
                upsert_directive(ctx.store, &directive)?;
                applied += 1;
            }
            Err(failure) => {
                tracing::warn!(line = failure.line, "skipping directive: {}", failure.reason);
                failures.push(failure);
            }
        }
    }

    let report = build_admin_report(&ctx.store.subscribers()?, &failures);
    let identity = ctx.config.identity();
    ctx.mailer.send(&OutgoingMail {
        from: identity.clone(),
        reply_to: identity,
        to: sender.to_string(),
        subject: format!(
            "[{}] Admin confirmation - Your changes were saved",
            ctx.config.appname
        ),
        body: report,
    })?;

    tracing::info!(applied, skipped = failures.len(), "admin changes saved");
    Ok(AdminOutcome::Applied { applied, failures })
}

#[tracing::instrument(name = "update message", skip(ctx, body))]
pub fn handle_update_message(
    ctx: &Context,
    recipient: &str,
    body: &str,
) -> Result<UpdateMessage, Error> {
    let key = recipient_identifier(recipient).map_err(|e| {
        tracing::error!("Unable to extract identifier from {}: {}", recipient, e);
        e
    })?;
    let mut update = ctx.store.update(&key).map_err(|e| {
        tracing::error!("No update record for {}: {}", key, e);
        e
    })?;

    update.message = ctx.cleaner.clean(body);
    ctx.store.save_update(&update)?;

    tracing::info!(key = %key, "update saved");
    Ok(UpdateMessage {
        key,
        cleaned: update.message,
    })
}
