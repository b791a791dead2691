use crate::address::parse_addr;
use crate::err::SendError;
use mailparse::{addrparse, MailAddr};
use std::io::{Read, Write};
use std::process::{Command, Stdio};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub from: String,
    pub reply_to: String,
    pub to: String,
    pub subject: String,
    pub body: String,
}

impl OutgoingMail {
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        for (key, value) in &[
            ("From", &self.from),
            ("Reply-To", &self.reply_to),
            ("To", &self.to),
            ("Subject", &self.subject),
        ] {
            buf.extend_from_slice(format!("{}: {}\r\n", key, value).as_bytes());
        }
        buf.extend_from_slice(b"MIME-Version: 1.0\r\n");
        buf.extend_from_slice(b"Content-Type: text/plain; charset=utf-8\r\n");
        buf.extend_from_slice(b"\r\n");
        for line in self.body.lines() {
            buf.extend_from_slice(line.as_bytes());
            buf.extend_from_slice(b"\r\n");
        }
        buf
    }
}

pub trait Mailer {
    fn send(&self, mail: &OutgoingMail) -> Result<(), SendError>;
}

#[derive(Debug, Clone)]
pub struct Sendmail {
    program: String,
}

impl Default for Sendmail {
    fn default() -> Self {
        Sendmail::new("sendmail")
    }
}

impl Sendmail {
    pub fn new(program: &str) -> Sendmail {
        Sendmail {
            program: program.to_string(),
        }
    }
}

impl Mailer for Sendmail {
    fn send(&self, mail: &OutgoingMail) -> Result<(), SendError> {
        let from = parse_addr(&mail.from).map_err(|_| SendError::InvalidAddress(mail.from.clone()))?;
        send(
            &self.program,
            Some(from.addr.as_str()),
            &[mail.to.as_str()],
            &mail.to_bytes(),
        )
    }
}

pub fn send(
    program: &str,
    from: Option<&str>,
    to: &[&str],
    message: &[u8],
) -> Result<(), SendError> {
    let mut process = Command::new(program);

    process.stdin(Stdio::piped()).stdout(Stdio::piped());

    if let Some(from) = from {
        process.arg("-f").arg(from);
    }

    for recip in to {
        for addr in addrparse(recip)?.iter() {
            match addr {
                MailAddr::Single(addr) => {
                    process.arg(&addr.addr);
                }
                MailAddr::Group(group) => {
                    for addr in &group.addrs {
                        process.arg(&addr.addr);
                    }
                }
            }
        }
    }

    let mut child = process.spawn().map_err(SendError::Spawn)?;

    {
        let stdin = child
            .stdin
            .as_mut()
            .ok_or_else(|| SendError::Unexpected("no stdin".to_string()))?;
        stdin.write_all(message).map_err(SendError::Pipe)?;
    }
    drop(child.stdin.take());

    let mut s = String::new();
    if let Some(stdout) = child.stdout.as_mut() {
        stdout.read_to_string(&mut s).map_err(SendError::Pipe)?;
    }
    let status = child.wait().map_err(SendError::Pipe)?;

    if !s.is_empty() || !status.success() {
        return Err(SendError::Unexpected(format!("{} {}", status, s.trim())));
    }

    tracing::info!(recipients = ?to, "mail handed to {}", program);
    Ok(())
}

#[cfg(test)]
pub use self::recording::RecordingMailer;

#[cfg(test)]
mod recording {
    use super::{Mailer, OutgoingMail};
    use crate::err::SendError;
    use std::cell::RefCell;

    #[derive(Debug, Default)]
    pub struct RecordingMailer {
        pub sent: RefCell<Vec<OutgoingMail>>,
    }

    impl Mailer for RecordingMailer {
        fn send(&self, mail: &OutgoingMail) -> Result<(), SendError> {
            self.sent.borrow_mut().push(mail.clone());
            Ok(())
        }
    }
}

#[cfg(test)]
mod test {
    use super::{Mailer, OutgoingMail, Sendmail};
    use crate::err::SendError;

    fn mail() -> OutgoingMail {
        OutgoingMail {
            from: "PIF <noreply@piffer.example>".to_string(),
            reply_to: "PIF <noreply@piffer.example>".to_string(),
            to: "admin@example.com".to_string(),
            subject: "[PIF] Admin confirmation - Your changes were saved".to_string(),
            body: "A <a@x.com> T1 subscribe lead\nB <b@x.com> T1 subscribe ".to_string(),
        }
    }

    #[test]
    fn renders_headers_and_crlf_body() {
        let rendered = String::from_utf8(mail().to_bytes()).unwrap();
        assert_eq!(
            rendered,
            "From: PIF <noreply@piffer.example>\r\n\
             Reply-To: PIF <noreply@piffer.example>\r\n\
             To: admin@example.com\r\n\
             Subject: [PIF] Admin confirmation - Your changes were saved\r\n\
             MIME-Version: 1.0\r\n\
             Content-Type: text/plain; charset=utf-8\r\n\
             \r\n\
             A <a@x.com> T1 subscribe lead\r\n\
             B <b@x.com> T1 subscribe \r\n"
        );
    }

    #[test]
    fn rendered_mail_parses() {
        let bytes = mail().to_bytes();
        let parsed = mailparse::parse_mail(&bytes).unwrap();
        assert_eq!(
            parsed.get_body().unwrap().trim_end(),
            "A <a@x.com> T1 subscribe lead\r\nB <b@x.com> T1 subscribe"
        );
    }

    #[test]
    fn missing_program() {
        let result = Sendmail::new("/nonexistent/sendmail").send(&mail());
        assert!(matches!(result, Err(SendError::Spawn(_))));
    }
}
