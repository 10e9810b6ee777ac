/// Collaborator turning a join URL into an embeddable image payload for
/// the session-created reply. Pure and stateless; implementations must
/// never block room mutation.
pub trait JoinImageGenerator: Send + Sync {
    fn generate(&self, join_url: &str) -> String;
}

/// Fallback that hands the URL straight back as the payload. Deployments
/// that want a scannable code plug in a QR encoder behind the same trait.
pub struct LinkImage;

impl JoinImageGenerator for LinkImage {
    fn generate(&self, join_url: &str) -> String {
        join_url.to_string()
    }
}

pub fn join_url(public_addr: &str, code: &str) -> String {
    format!("http://{}/?room={}", public_addr, code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_url_shape() {
        assert_eq!(
            join_url("games.local:3000", "AB2X"),
            "http://games.local:3000/?room=AB2X"
        );
    }

    #[test]
    fn test_link_image_echoes_url() {
        let url = join_url("games.local:3000", "AB2X");
        assert_eq!(LinkImage.generate(&url), url);
    }
}
