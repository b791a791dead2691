mod address;
mod config;
mod directive;
mod err;
mod handler;
mod message;
mod reply;
mod send;
mod store;

use crate::config::Config;
use crate::err::{Chain, Error};
use crate::handler::{handle, AdminOutcome, Context, HandlerKind, Outcome};
use crate::send::Sendmail;
use crate::store::Directory;
use std::env::args;
use std::io::{self, Read};
use std::process::exit;
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage: piffer <admin|update> <directory> < message";

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .with_target(false)
        .init();

    let mut argv = args().skip(1);
    let (kind, dir) = match (argv.next(), argv.next()) {
        (Some(kind), Some(dir)) => (kind, dir),
        _ => {
            eprintln!("{}", USAGE);
            exit(2);
        }
    };
    let kind: HandlerKind = match kind.parse() {
        Ok(kind) => kind,
        Err(e) => {
            eprintln!("{}\n{}", e, USAGE);
            exit(2);
        }
    };

    let mut buffer = Vec::new();
    if let Err(e) = io::stdin().lock().read_to_end(&mut buffer) {
        tracing::error!("couldn't read message: {}", e);
        exit(1);
    }

    if let Err(e) = run(kind, &dir, &buffer) {
        tracing::error!(error.cause_chain = %Chain(&e), "{} message failed", kind);
        exit(1);
    }
}

fn run(kind: HandlerKind, dir: &str, mail: &[u8]) -> Result<(), Error> {
    let config = Config::load(dir)?;
    let store = Directory::open(dir);
    let mailer = Sendmail::default();

    let id = store.archive(mail)?;
    tracing::debug!(id = %id, "archived inbound message");

    let ctx = Context::new(&config, &store, &mailer);
    match handle(&ctx, kind, mail)? {
        Outcome::Admin(AdminOutcome::Ignored) => {}
        Outcome::Admin(AdminOutcome::Applied { applied, failures }) => {
            tracing::debug!(applied, skipped = failures.len(), "admin message handled")
        }
        Outcome::Update(update) => tracing::debug!(
            key = %update.key,
            points = update.cleaned.lines().count(),
            "update message handled"
        ),
    }
    Ok(())
}
