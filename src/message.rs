use crate::err::MessageError;
use mailparse::{parse_mail, MailHeaderMap, ParsedMail};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub sender: String,
    pub recipient: String,
    pub body: String,
}

impl InboundMessage {
    pub fn parse(mail: &[u8]) -> Result<InboundMessage, MessageError> {
        let parsed = parse_mail(mail)?;
        let sender = parsed
            .headers
            .get_first_value("from")
            .ok_or(MessageError::MissingHeader("From"))?;
        let recipient = parsed
            .headers
            .get_first_value("to")
            .ok_or(MessageError::MissingHeader("To"))?;
        let body = plain_body(&parsed)?.ok_or(MessageError::NoPlainBody)?;

        Ok(InboundMessage {
            sender,
            recipient,
            body,
        })
    }
}

/// Decoded body of the first `text/plain` part, depth first.
fn plain_body(part: &ParsedMail) -> Result<Option<String>, MessageError> {
    if part.subparts.is_empty() {
        if part.ctype.mimetype.eq_ignore_ascii_case("text/plain") {
            return Ok(Some(part.get_body()?));
        }
        return Ok(None);
    }
    for sub in &part.subparts {
        if let Some(body) = plain_body(sub)? {
            return Ok(Some(body));
        }
    }
    Ok(None)
}

#[cfg(test)]
mod test {
    use super::InboundMessage;
    use crate::err::MessageError;

    #[test]
    fn a_plain_message() {
        let message = InboundMessage::parse(
            b"From: Ann <ann@example.com>\r\nTo: PIF <update+abc@example.com>\r\nSubject: Re: update\r\n\r\n* did things\r\n",
        )
        .unwrap();
        assert_eq!(message.sender, "Ann <ann@example.com>");
        assert_eq!(message.recipient, "PIF <update+abc@example.com>");
        assert_eq!(message.body, "* did things\r\n");
    }

    #[test]
    fn picks_the_plain_part() {
        let mail = concat!(
            "From: ann@example.com\r\n",
            "To: admin@example.com\r\n",
            "Content-Type: multipart/alternative; boundary=\"XX\"\r\n",
            "\r\n",
            "--XX\r\n",
            "Content-Type: text/html\r\n",
            "\r\n",
            "<p>html</p>\r\n",
            "--XX\r\n",
            "Content-Type: text/plain; charset=utf-8\r\n",
            "Content-Transfer-Encoding: quoted-printable\r\n",
            "\r\n",
            "A, a@x.com, T1=2C subscribe\r\n",
            "--XX--\r\n",
        );
        let message = InboundMessage::parse(mail.as_bytes()).unwrap();
        assert_eq!(message.body.trim_end(), "A, a@x.com, T1, subscribe");
    }

    #[test]
    fn missing_sender() {
        assert!(matches!(
            InboundMessage::parse(b"To: a@example.com\r\n\r\nbody\r\n"),
            Err(MessageError::MissingHeader("From"))
        ));
    }

    #[test]
    fn html_only() {
        assert!(matches!(
            InboundMessage::parse(
                b"From: a@example.com\r\nTo: b@example.com\r\nContent-Type: text/html\r\n\r\n<p>x</p>\r\n"
            ),
            Err(MessageError::NoPlainBody)
        ));
    }

    #[test]
    fn headerless_input() {
        assert!(matches!(
            InboundMessage::parse(b"bad input\r\n"),
            Err(MessageError::MissingHeader("From"))
        ));
    }
}
