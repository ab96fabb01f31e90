//! Embedded static resources.
//!
//! The page shell ships inside the binary; nothing is read from disk at
//! request time.

mod template;

pub use template::{Template, TemplateVars};

pub mod serve {
    use super::{Template, TemplateVars};

    /// Variables for index.html.
    pub struct IndexVars {
        /// Effective listening port. This is the port the bind retry
        /// actually landed on, so the browser opens its push channel
        /// against the right listener.
        pub port: u16,
        /// Watched file's display name.
        pub file_name: String,
    }

    impl TemplateVars for IndexVars {
        fn apply(&self, content: &str) -> String {
            content
                .replace("__MDSERVE_PORT__", &self.port.to_string())
                .replace("__MDSERVE_FILE__", &self.file_name)
        }
    }

    /// Page shell with the push-channel bootstrap script.
    pub const INDEX_HTML: Template<IndexVars> = Template::new(include_str!("index.html"));
}

#[cfg(test)]
mod tests {
    use super::serve::{INDEX_HTML, IndexVars};

    #[test]
    fn index_embeds_effective_port_and_file_name() {
        let html = INDEX_HTML.render(&IndexVars {
            port: 8090,
            file_name: "notes.md".to_string(),
        });
        assert!(html.contains("ws://localhost:8090/changes"));
        assert!(html.contains("notes.md"));
        assert!(!html.contains("__MDSERVE_PORT__"));
        assert!(!html.contains("__MDSERVE_FILE__"));
    }

    #[test]
    fn index_refetches_on_push() {
        let html = INDEX_HTML.render(&IndexVars {
            port: 8080,
            file_name: "notes.md".to_string(),
        });
        // The shell pulls /html on load and on every socket message
        assert!(html.contains("socket.onmessage = reload"));
        assert!(html.contains("fetch(\"/html\")"));
    }
}
