//! In-memory page driver.
//!
//! [`MockPage`] renders a [`MockApp`] into a small element tree and answers
//! selector queries against it the way the Chromium collector does. Clicks
//! and option selections take effect only after a configurable latency, so
//! the wait engine sees the same "not yet" states it sees against the live
//! storefront. Every applied mutation bumps a generation counter; handles
//! issued before it are stale.

use crate::driver::{ElementHandle, PageDriver, PopupListener};
use crate::locator::{Nth, Selector};
use crate::result::{Diagnostic, ProbeError, ProbeResult};
use async_trait::async_trait;
use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;

/// One node of a rendered mock document
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MockElement {
    /// Lower-case tag name
    pub tag: String,
    /// Attributes, including `id` and `class`
    pub attributes: BTreeMap<String, String>,
    /// Text directly inside this element
    pub text: String,
    /// Hidden elements (and their subtrees) report `visible: false`
    pub visible: bool,
    /// Form control value
    pub value: Option<String>,
    /// Child elements in document order
    pub children: Vec<MockElement>,
}

impl MockElement {
    /// Create a visible element
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into().to_lowercase(),
            visible: true,
            ..Self::default()
        }
    }

    /// Set the `id` attribute
    #[must_use]
    pub fn id(self, id: impl Into<String>) -> Self {
        self.attr("id", id)
    }

    /// Append a class
    #[must_use]
    pub fn class(mut self, class: impl Into<String>) -> Self {
        let class = class.into();
        let merged = match self.attributes.get("class") {
            Some(existing) if !existing.is_empty() => format!("{existing} {class}"),
            _ => class,
        };
        let _ = self.attributes.insert("class".to_string(), merged);
        self
    }

    /// Set an attribute
    #[must_use]
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let _ = self.attributes.insert(name.into(), value.into());
        self
    }

    /// Set the element's own text
    #[must_use]
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Set the form control value
    #[must_use]
    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Hide the element
    #[must_use]
    pub const fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    /// Append a child
    #[must_use]
    pub fn child(mut self, child: Self) -> Self {
        self.children.push(child);
        self
    }

    /// Append several children
    #[must_use]
    pub fn children(mut self, children: impl IntoIterator<Item = Self>) -> Self {
        self.children.extend(children);
        self
    }

    /// Attribute value
    #[must_use]
    pub fn get_attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Whether the `class` attribute lists `class`
    #[must_use]
    pub fn has_class(&self, class: &str) -> bool {
        self.get_attr("class")
            .is_some_and(|c| c.split_whitespace().any(|c| c == class))
    }

    /// Whitespace-normalized text of the element and its descendants
    #[must_use]
    pub fn text_content(&self) -> String {
        let mut parts = vec![self.text.clone()];
        parts.extend(self.children.iter().map(Self::text_content));
        normalize(&parts.join(" "))
    }

    fn implicit_role_matches(&self, role: &str) -> bool {
        if self.get_attr("role") == Some(role) {
            return true;
        }
        let input_type = self.get_attr("type").unwrap_or("text");
        match role {
            "button" => {
                self.tag == "button"
                    || (self.tag == "input" && matches!(input_type, "submit" | "button"))
            }
            "link" => self.tag == "a" && self.get_attr("href").is_some(),
            "textbox" => {
                self.tag == "textarea"
                    || (self.tag == "input" && matches!(input_type, "text" | "password"))
            }
            "combobox" => self.tag == "select",
            "img" => self.tag == "img",
            _ => false,
        }
    }

    fn accessible_name(&self) -> String {
        if let Some(label) = self.get_attr("aria-label") {
            return normalize(label);
        }
        if self.tag == "input" {
            return normalize(self.value.as_deref().unwrap_or_default());
        }
        self.text_content()
    }
}

fn normalize(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// A secondary context a click opens
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PopupSpec {
    /// Location the popup reports first
    pub initial_url: String,
    /// Location the popup settles on after redirecting
    pub final_url: String,
}

impl PopupSpec {
    /// Popup that stays where it opened
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        let url = url.into();
        Self {
            initial_url: url.clone(),
            final_url: url,
        }
    }

    /// Redirect after one latency period
    #[must_use]
    pub fn redirecting_to(mut self, url: impl Into<String>) -> Self {
        self.final_url = url.into();
        self
    }
}

/// Application simulated behind a [`MockPage`]
pub trait MockApp: Send {
    /// Current location
    fn url(&self) -> String;

    /// Render the current state as a document body
    fn render(&self) -> MockElement;

    /// Navigate to a location
    fn navigate(&mut self, url: &str) -> ProbeResult<()> {
        Err(ProbeError::Navigation {
            url: url.to_string(),
            message: "navigation not supported".to_string(),
        })
    }

    /// React to a click on `element`; may open a popup
    fn click(&mut self, element: &MockElement) -> Option<PopupSpec> {
        let _ = element;
        None
    }

    /// React to text typed into `element`
    fn fill(&mut self, element: &MockElement, text: &str) {
        let _ = (element, text);
    }

    /// React to an option chosen in `element`
    fn select_option(&mut self, element: &MockElement, label: &str) -> ProbeResult<()> {
        let _ = element;
        Err(ProbeError::page(format!("no option labelled {label:?}")))
    }
}

/// Third-party page opened in a popup
#[derive(Debug, Clone)]
pub struct ExternalPage {
    url: String,
}

impl ExternalPage {
    /// Create an external page at `url`
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

impl MockApp for ExternalPage {
    fn url(&self) -> String {
        self.url.clone()
    }

    fn render(&self) -> MockElement {
        MockElement::new("body").child(MockElement::new("h1").text(self.url.clone()))
    }

    fn navigate(&mut self, url: &str) -> ProbeResult<()> {
        self.url = url.to_string();
        Ok(())
    }
}

enum PendingKind {
    Click(MockElement),
    Select(MockElement, String),
    Navigate(String),
}

struct PendingOp {
    due: Instant,
    kind: PendingKind,
}

struct MockState {
    app: Box<dyn MockApp>,
    latency: Duration,
    pending: VecDeque<PendingOp>,
    generation: u64,
    popups: Vec<MockPage>,
    closed: bool,
    history: Vec<String>,
}

impl MockState {
    fn apply_due(&mut self) {
        let now = Instant::now();
        while self.pending.front().is_some_and(|op| op.due <= now) {
            let Some(op) = self.pending.pop_front() else {
                break;
            };
            match op.kind {
                PendingKind::Click(element) => {
                    if let Some(spec) = self.app.click(&element) {
                        let popup =
                            MockPage::new(ExternalPage::new(&spec.initial_url)).with_latency(self.latency);
                        if spec.final_url != spec.initial_url {
                            if let Ok(mut inner) = popup.state.lock() {
                                inner.pending.push_back(PendingOp {
                                    due: op.due + self.latency,
                                    kind: PendingKind::Navigate(spec.final_url),
                                });
                            }
                        }
                        self.popups.push(popup);
                    }
                }
                PendingKind::Select(element, label) => {
                    if let Err(e) = self.app.select_option(&element, &label) {
                        tracing::warn!(error = %e, "mock select had no effect");
                    }
                }
                PendingKind::Navigate(url) => {
                    if let Err(e) = self.app.navigate(&url) {
                        tracing::warn!(error = %e, "mock redirect failed");
                    }
                }
            }
            self.generation += 1;
        }
    }

    fn ensure_open(&self) -> ProbeResult<()> {
        if self.closed {
            Err(ProbeError::page("page is closed"))
        } else {
            Ok(())
        }
    }

    fn element_for(&self, handle: &ElementHandle) -> ProbeResult<MockElement> {
        let stale = || ProbeError::StaleElement {
            handle: handle.id.clone(),
        };
        let (generation, path) = handle.id.split_once(':').ok_or_else(stale)?;
        if generation.parse::<u64>().ok() != Some(self.generation) {
            return Err(stale());
        }
        let mut node = self.app.render();
        for step in path.split('.').filter(|s| !s.is_empty()) {
            let index: usize = step.parse().map_err(|_| stale())?;
            if index >= node.children.len() {
                return Err(stale());
            }
            node = node.children.swap_remove(index);
        }
        Ok(node)
    }
}

/// In-memory [`PageDriver`] backed by a [`MockApp`]
#[derive(Clone)]
pub struct MockPage {
    state: Arc<Mutex<MockState>>,
}

impl fmt::Debug for MockPage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockPage")
            .field("url", &self.url())
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

impl MockPage {
    /// Create a page rendering `app`
    #[must_use]
    pub fn new(app: impl MockApp + 'static) -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState {
                app: Box::new(app),
                latency: Duration::ZERO,
                pending: VecDeque::new(),
                generation: 0,
                popups: Vec::new(),
                closed: false,
                history: Vec::new(),
            })),
        }
    }

    /// Delay between a click or selection and its effect
    #[must_use]
    pub fn with_latency(self, latency: Duration) -> Self {
        if let Ok(mut state) = self.state.lock() {
            state.latency = latency;
        }
        self
    }

    fn lock(&self) -> ProbeResult<MutexGuard<'_, MockState>> {
        self.state
            .lock()
            .map_err(|_| ProbeError::page("mock page state poisoned"))
    }

    /// Recorded interactions, oldest first
    #[must_use]
    pub fn history(&self) -> Vec<String> {
        self.lock().map(|s| s.history.clone()).unwrap_or_default()
    }

    /// Whether an interaction starting with `prefix` was recorded
    #[must_use]
    pub fn was_called(&self, prefix: &str) -> bool {
        self.history().iter().any(|h| h.starts_with(prefix))
    }

    /// Whether [`PageDriver::close`] was called
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.lock().map(|s| s.closed).unwrap_or(true)
    }

    /// Current location, applying any due effects first
    #[must_use]
    pub fn url(&self) -> String {
        self.lock()
            .map(|mut s| {
                s.apply_due();
                s.app.url()
            })
            .unwrap_or_default()
    }

    /// Every popup this page has opened
    #[must_use]
    pub fn popups(&self) -> Vec<Self> {
        self.lock().map(|s| s.popups.clone()).unwrap_or_default()
    }

    fn popup_count(&self) -> ProbeResult<usize> {
        let mut state = self.lock()?;
        state.apply_due();
        Ok(state.popups.len())
    }

    fn enqueue(
        &self,
        element: &ElementHandle,
        make: impl FnOnce(MockElement) -> ProbeResult<PendingKind>,
    ) -> ProbeResult<String> {
        let mut state = self.lock()?;
        state.ensure_open()?;
        state.apply_due();
        let target = state.element_for(element)?;
        let description = describe(&target);
        let due = Instant::now() + state.latency;
        let kind = make(target)?;
        state.pending.push_back(PendingOp { due, kind });
        if state.latency.is_zero() {
            state.apply_due();
        }
        Ok(description)
    }
}

#[async_trait]
impl PageDriver for MockPage {
    async fn goto(&self, url: &str) -> ProbeResult<()> {
        let mut state = self.lock()?;
        state.ensure_open()?;
        state.history.push(format!("goto:{url}"));
        state.pending.clear();
        state.app.navigate(url)?;
        state.generation += 1;
        Ok(())
    }

    async fn current_url(&self) -> ProbeResult<String> {
        let mut state = self.lock()?;
        state.ensure_open()?;
        state.apply_due();
        Ok(state.app.url())
    }

    async fn query_all(&self, selector: &Selector) -> ProbeResult<Vec<ElementHandle>> {
        let mut state = self.lock()?;
        state.ensure_open()?;
        state.apply_due();
        let root = state.app.render();
        let document = FlatDocument::new(&root);
        let matches = document.select(selector, None)?;
        Ok(matches
            .into_iter()
            .map(|i| document.handle(i, state.generation))
            .collect())
    }

    async fn click(&self, element: &ElementHandle) -> ProbeResult<()> {
        let target = self.enqueue(element, |el| Ok(PendingKind::Click(el)))?;
        self.lock()?.history.push(format!("click:{target}"));
        Ok(())
    }

    async fn fill(&self, element: &ElementHandle, text: &str) -> ProbeResult<()> {
        let mut state = self.lock()?;
        state.ensure_open()?;
        state.apply_due();
        let target = state.element_for(element)?;
        state.app.fill(&target, text);
        state.history.push(format!("fill:{}={text}", describe(&target)));
        Ok(())
    }

    async fn select_option(&self, element: &ElementHandle, label: &str) -> ProbeResult<()> {
        let target = self.enqueue(element, |el| {
            if el.tag == "select" {
                Ok(PendingKind::Select(el, label.to_string()))
            } else {
                Err(ProbeError::page(format!("{} is not a <select>", describe(&el))))
            }
        })?;
        self.lock()?.history.push(format!("select:{target}={label}"));
        Ok(())
    }

    async fn arm_popup_listener(&self) -> ProbeResult<Box<dyn PopupListener>> {
        let seen = self.popup_count()?;
        Ok(Box::new(MockPopupListener {
            page: self.clone(),
            seen: Mutex::new(seen),
        }))
    }

    async fn close(&self) -> ProbeResult<()> {
        let mut state = self.lock()?;
        state.closed = true;
        state.history.push("close".to_string());
        Ok(())
    }
}

/// Reports popups a [`MockPage`] opened after arming
struct MockPopupListener {
    page: MockPage,
    seen: Mutex<usize>,
}

#[async_trait]
impl PopupListener for MockPopupListener {
    async fn try_next(&self) -> ProbeResult<Option<Box<dyn PageDriver>>> {
        let count = self.page.popup_count()?;
        let mut seen = self
            .seen
            .lock()
            .map_err(|_| ProbeError::page("popup listener poisoned"))?;
        if count <= *seen {
            return Ok(None);
        }
        let popup = self.page.lock()?.popups[*seen].clone();
        *seen += 1;
        Ok(Some(Box::new(popup)))
    }
}

fn describe(element: &MockElement) -> String {
    match element.get_attr("id") {
        Some(id) => format!("{}#{id}", element.tag),
        None => format!("{}[{}]", element.tag, element.text_content()),
    }
}

/// Document flattened into pre-order, the order selector results come in
struct FlatDocument<'a> {
    nodes: Vec<FlatNode<'a>>,
}

struct FlatNode<'a> {
    element: &'a MockElement,
    path: Vec<usize>,
    parent: Option<usize>,
    visible: bool,
    text: String,
}

impl<'a> FlatDocument<'a> {
    fn new(root: &'a MockElement) -> Self {
        let mut nodes = Vec::new();
        Self::flatten(root, Vec::new(), None, true, &mut nodes);
        Self { nodes }
    }

    fn flatten(
        element: &'a MockElement,
        path: Vec<usize>,
        parent: Option<usize>,
        parent_visible: bool,
        nodes: &mut Vec<FlatNode<'a>>,
    ) {
        let index = nodes.len();
        let visible = parent_visible && element.visible;
        nodes.push(FlatNode {
            element,
            path: path.clone(),
            parent,
            visible,
            text: element.text_content(),
        });
        for (i, child) in element.children.iter().enumerate() {
            let mut child_path = path.clone();
            child_path.push(i);
            Self::flatten(child, child_path, Some(index), visible, nodes);
        }
    }

    fn handle(&self, index: usize, generation: u64) -> ElementHandle {
        let node = &self.nodes[index];
        let path = node
            .path
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(".");
        ElementHandle {
            id: format!("{generation}:{path}"),
            tag_name: node.element.tag.clone(),
            text_content: node.text.clone(),
            visible: node.visible,
            value: node.element.value.clone(),
            attributes: node.element.attributes.clone(),
        }
    }

    fn is_descendant(&self, index: usize, scope: usize) -> bool {
        let mut current = self.nodes[index].parent;
        while let Some(p) = current {
            if p == scope {
                return true;
            }
            current = self.nodes[p].parent;
        }
        false
    }

    fn candidates(&self, scope: Option<usize>) -> Vec<usize> {
        (0..self.nodes.len())
            .filter(|&i| scope.is_none_or(|s| self.is_descendant(i, s)))
            .collect()
    }

    fn select(&self, selector: &Selector, scope: Option<usize>) -> ProbeResult<Vec<usize>> {
        let candidates = self.candidates(scope);
        Ok(match selector {
            Selector::Css(css) => {
                let groups = parse_css(css)?;
                candidates
                    .into_iter()
                    .filter(|&i| groups.iter().any(|chain| self.matches_chain(i, chain)))
                    .collect()
            }
            Selector::Text(text) => {
                let needle = text.to_lowercase();
                let contains = |i: usize| self.nodes[i].text.to_lowercase().contains(&needle);
                candidates
                    .into_iter()
                    .filter(|&i| contains(i))
                    .filter(|&i| {
                        !self
                            .nodes
                            .iter()
                            .enumerate()
                            .any(|(j, n)| n.parent == Some(i) && contains(j))
                    })
                    .collect()
            }
            Selector::Placeholder(placeholder) => candidates
                .into_iter()
                .filter(|&i| self.nodes[i].element.get_attr("placeholder") == Some(placeholder))
                .collect(),
            Selector::Role { role, name } => candidates
                .into_iter()
                .filter(|&i| {
                    let element = self.nodes[i].element;
                    element.implicit_role_matches(role)
                        && name.as_ref().is_none_or(|name| {
                            element
                                .accessible_name()
                                .to_lowercase()
                                .contains(&name.to_lowercase())
                        })
                })
                .collect(),
            Selector::Within { parent, child } => {
                let mut scopes = self.select(parent.selector(), scope)?;
                match parent.narrowing() {
                    Nth::All => {}
                    Nth::First => scopes.truncate(1),
                    Nth::Index(n) => {
                        scopes = scopes.get(n).copied().into_iter().collect();
                    }
                }
                let mut out = Vec::new();
                for s in scopes {
                    out.extend(self.select(child, Some(s))?);
                }
                out
            }
        })
    }

    fn matches_chain(&self, index: usize, chain: &[Compound]) -> bool {
        let Some((last, ancestors)) = chain.split_last() else {
            return false;
        };
        if !last.matches(self.nodes[index].element) {
            return false;
        }
        let mut current = self.nodes[index].parent;
        for compound in ancestors.iter().rev() {
            loop {
                match current {
                    None => return false,
                    Some(p) => {
                        current = self.nodes[p].parent;
                        if compound.matches(self.nodes[p].element) {
                            break;
                        }
                    }
                }
            }
        }
        true
    }
}

/// One compound CSS selector such as `input.form_input[type=text]`
#[derive(Debug, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<(String, Option<String>)>,
    missing_attrs: Vec<String>,
}

impl Compound {
    fn matches(&self, element: &MockElement) -> bool {
        self.tag.as_ref().is_none_or(|t| t == "*" || *t == element.tag)
            && self.id.as_deref().is_none_or(|id| element.get_attr("id") == Some(id))
            && self.classes.iter().all(|c| element.has_class(c))
            && self.attrs.iter().all(|(name, value)| match value {
                None => element.get_attr(name).is_some(),
                Some(v) => element.get_attr(name) == Some(v.as_str()),
            })
            && self.missing_attrs.iter().all(|a| element.get_attr(a).is_none())
    }
}

/// Parse the CSS subset the storefront uses: comma lists of descendant
/// chains of compound selectors, with `[attr]`, `[attr=value]` and
/// `:not([attr])`.
fn parse_css(css: &str) -> ProbeResult<Vec<Vec<Compound>>> {
    let invalid = |reason: &str| {
        ProbeError::resolution(Diagnostic::new(
            format!("css={css}"),
            "a supported selector",
            reason,
            Duration::ZERO,
        ))
    };
    let mut groups = Vec::new();
    for group in split_outside_brackets(css, |c| c == ',') {
        let chain = split_outside_brackets(&group, char::is_whitespace)
            .iter()
            .filter(|part| !part.is_empty())
            .map(|part| parse_compound(part).ok_or_else(|| invalid("unsupported selector")))
            .collect::<ProbeResult<Vec<_>>>()?;
        if chain.is_empty() {
            return Err(invalid("empty selector"));
        }
        groups.push(chain);
    }
    Ok(groups)
}

fn split_outside_brackets(input: &str, is_sep: impl Fn(char) -> bool) -> Vec<String> {
    let mut parts = vec![String::new()];
    let mut depth = 0_i32;
    let mut quote: Option<char> = None;
    for c in input.chars() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '[' | '(') => depth += 1,
            (None, ']' | ')') => depth -= 1,
            (None, c) if depth == 0 && is_sep(c) => {
                parts.push(String::new());
                continue;
            }
            _ => {}
        }
        if let Some(last) = parts.last_mut() {
            last.push(c);
        }
    }
    parts.into_iter().map(|p| p.trim().to_string()).collect()
}

fn parse_compound(input: &str) -> Option<Compound> {
    let is_ident = |c: char| c.is_ascii_alphanumeric() || c == '-' || c == '_';
    let mut compound = Compound::default();
    let mut rest = input;

    let tag_len = rest
        .find(|c: char| !(is_ident(c) || c == '*'))
        .unwrap_or(rest.len());
    if tag_len > 0 {
        compound.tag = Some(rest[..tag_len].to_lowercase());
        rest = &rest[tag_len..];
    }

    while let Some(c) = rest.chars().next() {
        match c {
            '#' | '.' => {
                let body = &rest[1..];
                let len = body.find(|c: char| !is_ident(c)).unwrap_or(body.len());
                if len == 0 {
                    return None;
                }
                let ident = body[..len].to_string();
                if c == '#' {
                    compound.id = Some(ident);
                } else {
                    compound.classes.push(ident);
                }
                rest = &body[len..];
            }
            '[' => {
                let end = rest.find(']')?;
                compound.attrs.push(parse_attr(&rest[1..end]));
                rest = &rest[end + 1..];
            }
            ':' => {
                let body = rest.strip_prefix(":not([")?;
                let end = body.find("])")?;
                compound.missing_attrs.push(body[..end].trim().to_string());
                rest = &body[end + 2..];
            }
            _ => return None,
        }
    }
    Some(compound)
}

fn parse_attr(body: &str) -> (String, Option<String>) {
    match body.split_once('=') {
        None => (body.trim().to_string(), None),
        Some((name, value)) => {
            let value = value.trim().trim_matches(|c| c == '"' || c == '\'');
            (name.trim().to_string(), Some(value.to_string()))
        }
    }
}
