use minijinja::{Environment, Value};
use serde::Serialize;

const LOGO_URL: &str =
    "https://upload.wikimedia.org/wikipedia/en/thumb/3/3f/IGNOU_logo.svg/1200px-IGNOU_logo.svg.png";

const TEMPLATES: &[(&str, &str)] = &[
    ("layout.html", include_str!("../../templates/layout.html")),
    ("home.html", include_str!("../../templates/home.html")),
    ("chat.html", include_str!("../../templates/chat.html")),
    ("summarizer.html", include_str!("../../templates/summarizer.html")),
    ("quiz.html", include_str!("../../templates/quiz.html")),
    ("resources.html", include_str!("../../templates/resources.html")),
];

/// Sidebar entry.
#[derive(Serialize)]
struct NavItem {
    key: &'static str,
    label: &'static str,
    path: &'static str,
}

const NAV: &[NavItem] = &[
    NavItem {
        key: "home",
        label: "Home",
        path: "/",
    },
    NavItem {
        key: "chat",
        label: "AI Chatbot",
        path: "/chat",
    },
    NavItem {
        key: "summarizer",
        label: "Notes Summarizer",
        path: "/summarizer",
    },
    NavItem {
        key: "quiz",
        label: "Quiz Section",
        path: "/quiz",
    },
    NavItem {
        key: "resources",
        label: "Resources",
        path: "/resources",
    },
];

/// Compiled page templates sharing the sidebar layout.
pub struct Renderer {
    env: Environment<'static>,
}

impl Renderer {
    /// Compile every page template; fails on a template syntax error.
    pub fn new() -> Result<Self, minijinja::Error> {
        let mut env = Environment::new();
        for &(name, source) in TEMPLATES {
            env.add_template(name, source)?;
        }
        env.add_global("nav", Value::from_serialize(NAV));
        env.add_global("logo_url", LOGO_URL);
        Ok(Self { env })
    }

    /// Render template `name` with the given context.
    pub fn render<S: Serialize>(&self, name: &str, context: S) -> Result<String, minijinja::Error> {
        self.env.get_template(name)?.render(context)
    }
}

/// Inline status message shown above a page's content.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct Flash {
    kind: FlashKind,
    message: String,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "lowercase")]
enum FlashKind {
    Success,
    Warning,
    Error,
}

impl Flash {
    pub(crate) fn success(message: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Success,
            message: message.into(),
        }
    }

    pub(crate) fn warning(message: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Warning,
            message: message.into(),
        }
    }

    pub(crate) fn error(message: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Error,
            message: message.into(),
        }
    }
}
