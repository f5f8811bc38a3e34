//! Helpers for keeping personal data out of logs.

/// Masks the local part of an email, keeping its first character.
pub(crate) fn mask_email(email: &str) -> String {
    match email.find('@') {
        Some(at_pos) => {
            let (local, domain) = email.split_at(at_pos);
            let masked_local = match local.chars().next() {
                Some(first) if local.len() > 1 => format!("{first}***"),
                _ => "***".to_string(),
            };
            format!("{masked_local}{domain}")
        }
        None => "***".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masks_local_part() {
        assert_eq!(mask_email("alice@prisma.io"), "a***@prisma.io");
        assert_eq!(mask_email("a@prisma.io"), "***@prisma.io");
        assert_eq!(mask_email("not-an-email"), "***");
    }
}
