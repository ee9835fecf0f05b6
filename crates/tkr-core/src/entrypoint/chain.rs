use crate::entrypoint::TOOLS_DIR;

/// Index of one post file written by the helper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Barrier(usize);

impl Barrier {
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }

    pub fn path(self) -> String {
        format!("{TOOLS_DIR}/{}", self.0)
    }
}

/// One redirected container: wait for `wait`, run the entrypoint, then signal `post`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub wait: Option<Barrier>,
    pub post: Barrier,
    pub entrypoint: String,
    /// Remaining command words followed by the container's args.
    pub args: Vec<String>,
}

impl Link {
    /// Helper arguments: `-wait_file W -post_file P -entrypoint E -- ARGS...`.
    pub fn render(&self) -> Vec<String> {
        let mut out = Vec::with_capacity(7 + self.args.len());
        out.push("-wait_file".to_string());
        out.push(self.wait.map(Barrier::path).unwrap_or_default());
        out.push("-post_file".to_string());
        out.push(self.post.path());
        out.push("-entrypoint".to_string());
        out.push(self.entrypoint.clone());
        out.push("--".to_string());
        out.extend(self.args.iter().cloned());
        out
    }
}

/// Ordered wait/post chain; link `i` posts barrier `i` and waits on `i - 1`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Chain {
    links: Vec<Link>,
}

impl Chain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a link running `entrypoint args...` after the previous one.
    pub fn push(&mut self, entrypoint: String, args: Vec<String>) -> &Link {
        let wait = self.links.last().map(|l| l.post);
        let post = Barrier(self.links.len());
        self.links.push(Link {
            wait,
            post,
            entrypoint,
            args,
        });
        &self.links[self.links.len() - 1]
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }
}
