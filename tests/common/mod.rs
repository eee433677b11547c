//! Simulated Pipeline Studio for executor tests
//!
//! Renders a small DOM from application state on every lookup and applies
//! click/type handlers the way the real studio's UI would. Element handles
//! carry a render generation, so handles taken before a state change come
//! back as stale, like in a real browser.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashSet};
use std::iter::Peekable;
use std::str::Chars;
use std::time::Duration;

use async_trait::async_trait;
use uiflow::driver::keys;
use uiflow::{Browser, ElementRef, Error, Locator, Result, RunOptions};

pub const BASE: &str = "http://studio.test";

/// Fast polling so failing scenarios finish quickly
pub fn options() -> RunOptions {
    RunOptions {
        base_url: BASE.to_string(),
        default_timeout: Duration::from_millis(300),
        poll_interval: Duration::from_millis(5),
        quiet: true,
        ..Default::default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    OpenResourceCenter,
    Create,
    ToggleSection,
    AddFileDelete,
    OpenNodeConfig,
    CloseNodeConfig,
    OpenConfig,
    ToggleInstrumentation,
    ToggleStats,
    ApplyConfig,
    EditName,
    Deploy,
    OpenModeless,
    PipelineConfigTab,
    CloseModeless,
    OpenActions,
    DeleteRequest,
    ConfirmDelete,
    CancelDelete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Reference,
    Path,
    PipelineName,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deployed {
    pub name: String,
    pub stage: String,
    pub path: String,
    pub instrumentation: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Page {
    Blank,
    Home,
    Studio,
    View(String),
    List,
}

#[derive(Debug)]
struct Draft {
    section_open: bool,
    nodes: Vec<&'static str>,
    popover_open: bool,
    reference: String,
    path: String,
    config_open: bool,
    instrumentation: bool,
    pending_instrumentation: bool,
    stats: bool,
    name_editing: bool,
    name_input: String,
    name: String,
    error: Option<String>,
}

impl Default for Draft {
    fn default() -> Self {
        Self {
            section_open: false,
            nodes: Vec::new(),
            popover_open: false,
            reference: String::new(),
            path: String::new(),
            config_open: false,
            instrumentation: true,
            pending_instrumentation: true,
            stats: false,
            name_editing: false,
            name_input: String::new(),
            name: String::new(),
            error: None,
        }
    }
}

#[derive(Debug, Default)]
struct ViewState {
    modeless_open: bool,
    pipeline_tab: bool,
    actions_open: bool,
    confirm_open: bool,
}

// === DOM ===

#[derive(Debug, Clone, Default)]
struct Node {
    tag: &'static str,
    id: Option<&'static str>,
    classes: Vec<&'static str>,
    attrs: Vec<(&'static str, &'static str)>,
    text: String,
    on_click: Option<Action>,
    hidden: bool,
    field: Option<Field>,
    children: Vec<Node>,
}

fn el(tag: &'static str) -> Node {
    Node {
        tag,
        ..Default::default()
    }
}

impl Node {
    fn id(mut self, id: &'static str) -> Self {
        self.id = Some(id);
        self
    }
    fn class(mut self, class: &'static str) -> Self {
        self.classes.push(class);
        self
    }
    fn testid(mut self, value: &'static str) -> Self {
        self.attrs.push(("data-testid", value));
        self
    }
    fn text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }
    fn on_click(mut self, action: Action) -> Self {
        self.on_click = Some(action);
        self
    }
    fn hidden(mut self, hidden: bool) -> Self {
        self.hidden = hidden;
        self
    }
    fn field(mut self, field: Field) -> Self {
        self.field = Some(field);
        self
    }
    fn child(mut self, child: Node) -> Self {
        self.children.push(child);
        self
    }
    fn child_if(self, cond: bool, make: impl FnOnce() -> Node) -> Self {
        if cond {
            self.child(make())
        } else {
            self
        }
    }
}

struct Flat {
    node: Node,
    parent: Option<usize>,
}

fn flatten(root: Node) -> Vec<Flat> {
    fn push(mut node: Node, parent: Option<usize>, out: &mut Vec<Flat>) {
        let children = std::mem::take(&mut node.children);
        let idx = out.len();
        out.push(Flat { node, parent });
        for child in children {
            push(child, Some(idx), out);
        }
    }

    let mut out = Vec::new();
    push(root, None, &mut out);
    out
}

fn is_descendant(flat: &[Flat], mut idx: usize, ancestor: usize) -> bool {
    while let Some(parent) = flat[idx].parent {
        if parent == ancestor {
            return true;
        }
        idx = parent;
    }
    false
}

/// Compound selector without combinators: `tag#id.class[attr=value]`
#[derive(Debug, Default)]
struct Selector {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<(String, String)>,
}

fn take_ident(chars: &mut Peekable<Chars<'_>>) -> String {
    let mut s = String::new();
    while let Some(&c) = chars.peek() {
        if c.is_alphanumeric() || c == '-' || c == '_' {
            s.push(c);
            chars.next();
        } else {
            break;
        }
    }
    s
}

fn parse_selector(sel: &str) -> Result<Selector> {
    let invalid = || Error::webdriver("invalid selector", &format!("unsupported selector '{}'", sel));
    let mut selector = Selector::default();
    let mut chars = sel.trim().chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            '#' => {
                chars.next();
                selector.id = Some(take_ident(&mut chars));
            }
            '.' => {
                chars.next();
                selector.classes.push(take_ident(&mut chars));
            }
            '[' => {
                chars.next();
                let inner: String = chars.by_ref().take_while(|&c| c != ']').collect();
                let (key, value) = inner.split_once('=').ok_or_else(invalid)?;
                let value = value.trim().trim_matches('"').trim_matches('\'');
                selector
                    .attrs
                    .push((key.trim().to_string(), value.to_string()));
            }
            c if c.is_alphabetic() => selector.tag = Some(take_ident(&mut chars)),
            _ => return Err(invalid()),
        }
    }

    let empty_part = selector.id.as_deref() == Some("")
        || selector.classes.iter().any(|c| c.is_empty());
    if empty_part {
        return Err(invalid());
    }
    Ok(selector)
}

impl Selector {
    fn matches(&self, node: &Node) -> bool {
        self.tag.as_deref().map_or(true, |t| t == node.tag)
            && self.id.as_deref().map_or(true, |id| node.id == Some(id))
            && self.classes.iter().all(|c| node.classes.contains(&c.as_str()))
            && self
                .attrs
                .iter()
                .all(|(k, v)| node.attrs.iter().any(|(nk, nv)| nk == k && nv == v))
    }
}

// === Application ===

/// In-process stand-in for the pipeline studio web application
pub struct Studio {
    pub url: String,
    /// When false, every navigation fails like a refused connection
    pub reachable: bool,
    /// Upcoming clicks to reject as stale, simulating a re-render mid-click
    pub stale_clicks: usize,
    /// Lookups after opening the resource center before its content renders
    pub resource_center_delay: u32,
    pub deployed: BTreeMap<String, Deployed>,
    pub deploy_history: Vec<Deployed>,
    pub actions: Vec<Action>,
    pub closed: bool,
    page: Page,
    generation: u64,
    resource_center_open: bool,
    finds_since_open: u32,
    shown: HashSet<&'static str>,
    draft: Draft,
    view: ViewState,
}

impl Studio {
    pub fn new() -> Self {
        Self {
            url: "about:blank".to_string(),
            reachable: true,
            stale_clicks: 0,
            resource_center_delay: 0,
            deployed: BTreeMap::new(),
            deploy_history: Vec::new(),
            actions: Vec::new(),
            closed: false,
            page: Page::Blank,
            generation: 0,
            resource_center_open: false,
            finds_since_open: 0,
            shown: HashSet::new(),
            draft: Draft::default(),
            view: ViewState::default(),
        }
    }

    fn go(&mut self, page: Page) {
        self.url = match &page {
            Page::Blank => "about:blank".to_string(),
            Page::Home => format!("{}/", BASE),
            Page::Studio => format!("{}/pipelines/studio", BASE),
            Page::View(name) => format!("{}/pipelines/view/{}", BASE, name),
            Page::List => format!("{}/pipelines", BASE),
        };
        if page == Page::Studio {
            self.draft = Draft::default();
            self.shown.clear();
        }
        self.view = ViewState::default();
        self.resource_center_open = false;
        self.page = page;
        self.generation += 1;
    }

    fn apply(&mut self, action: Action) {
        self.actions.push(action);
        match action {
            Action::OpenResourceCenter => {
                self.resource_center_open = !self.resource_center_open;
                self.finds_since_open = 0;
            }
            Action::Create => self.go(Page::Studio),
            Action::ToggleSection => self.draft.section_open = !self.draft.section_open,
            Action::AddFileDelete => self.draft.nodes.push("File Delete"),
            Action::OpenNodeConfig => self.draft.popover_open = true,
            Action::CloseNodeConfig => self.draft.popover_open = false,
            Action::OpenConfig => {
                self.draft.config_open = true;
                self.draft.pending_instrumentation = self.draft.instrumentation;
            }
            Action::ToggleInstrumentation => {
                self.draft.pending_instrumentation = !self.draft.pending_instrumentation
            }
            Action::ToggleStats => self.draft.stats = !self.draft.stats,
            Action::ApplyConfig => {
                self.draft.instrumentation = self.draft.pending_instrumentation;
                self.draft.config_open = false;
            }
            Action::EditName => {
                self.draft.name_editing = true;
                self.draft.name_input = self.draft.name.clone();
            }
            Action::Deploy => self.deploy(),
            Action::OpenModeless => {
                self.view.modeless_open = true;
                self.view.pipeline_tab = false;
            }
            Action::PipelineConfigTab => self.view.pipeline_tab = true,
            Action::CloseModeless => self.view.modeless_open = false,
            Action::OpenActions => self.view.actions_open = !self.view.actions_open,
            Action::DeleteRequest => {
                self.view.actions_open = false;
                self.view.confirm_open = true;
            }
            Action::ConfirmDelete => {
                if let Page::View(name) = &self.page {
                    let name = name.clone();
                    self.deployed.remove(&name);
                }
                self.go(Page::List);
            }
            Action::CancelDelete => self.view.confirm_open = false,
        }
        self.generation += 1;
    }

    fn deploy(&mut self) {
        let d = &self.draft;
        let error = if d.name.is_empty() {
            Some("Please name your pipeline")
        } else if d.nodes.is_empty() {
            Some("Add at least one stage")
        } else if d.path.is_empty() {
            Some("Required property 'Path' is missing")
        } else {
            None
        };
        if let Some(e) = error {
            self.draft.error = Some(e.to_string());
            return;
        }

        let d = &self.draft;
        let deployed = Deployed {
            name: d.name.clone(),
            stage: "FileDelete".to_string(),
            path: d.path.clone(),
            instrumentation: d.instrumentation,
        };
        self.deployed.insert(deployed.name.clone(), deployed.clone());
        self.deploy_history.push(deployed.clone());
        self.go(Page::View(deployed.name));
    }

    fn field_mut(&mut self, field: Field) -> &mut String {
        match field {
            Field::Reference => &mut self.draft.reference,
            Field::Path => &mut self.draft.path,
            Field::PipelineName => &mut self.draft.name_input,
        }
    }

    fn render(&self) -> Node {
        let body = el("body").class("app");
        match &self.page {
            Page::Blank => body,
            Page::Home => self.render_home(body),
            Page::Studio => self.render_studio(body),
            Page::View(name) => self.render_view(body, name),
            Page::List => self.render_list(body),
        }
    }

    fn render_home(&self, body: Node) -> Node {
        let rc_ready =
            self.resource_center_open && self.finds_since_open >= self.resource_center_delay;
        body.child(el("div").class("app-header").child(el("span").class("brand").text("Data Platform")))
            .child(
                el("button")
                    .id("resource-center-btn")
                    .text("+")
                    .on_click(Action::OpenResourceCenter),
            )
            .child_if(rc_ready, || {
                el("div").class("resource-center").child(
                    el("div")
                        .class("resource-center-entity")
                        .child(el("h4").text("Pipeline"))
                        .child(el("button").class("btn").text("Create").on_click(Action::Create)),
                )
            })
            .child(el("div").class("home").child(el("h2").text("Welcome")))
    }

    fn render_studio(&self, body: Node) -> Node {
        let d = &self.draft;
        let name_label = if d.name.is_empty() {
            "Name your pipeline".to_string()
        } else {
            d.name.clone()
        };

        let top = el("div")
            .class("top-panel")
            .child(el("div").class("pipeline-name").text(name_label).on_click(Action::EditName))
            .child_if(d.name_editing, || {
                el("input").id("pipeline-name-input").field(Field::PipelineName)
            })
            .child(el("button").class("btn").text("Configure").on_click(Action::OpenConfig))
            .child(
                el("button")
                    .testid("deploy-pipeline")
                    .text("Deploy")
                    .on_click(Action::Deploy),
            );

        let left = el("div")
            .class("left-panel")
            .child(el("div").class("item").child(el("div").class("item-header").child(el("span").text("Source"))))
            .child(
                el("div")
                    .class("item")
                    .on_click(Action::ToggleSection)
                    .child(el("div").class("item-header").child(el("span").text("Conditions and Actions"))),
            )
            .child_if(d.section_open, || {
                el("div")
                    .class("item-body-wrapper")
                    .child(
                        el("div")
                            .class("plugin")
                            .on_click(Action::AddFileDelete)
                            .child(el("span").text("File Delete")),
                    )
                    .child(el("div").class("plugin").child(el("span").text("Email")))
            });

        let configure_hidden = !self.shown.contains("node-configure-btn");
        let mut canvas = el("div").class("canvas");
        for node in &d.nodes {
            canvas = canvas.child(
                el("div")
                    .class("node")
                    .child(el("span").class("node-name").text(*node))
                    .child(
                        el("button")
                            .class("node-configure-btn")
                            .text("Properties")
                            .hidden(configure_hidden)
                            .on_click(Action::OpenNodeConfig),
                    ),
            );
        }

        body.child(top)
            .child_if(d.error.is_some(), || {
                el("div")
                    .class("error-banner")
                    .text(d.error.clone().unwrap_or_default())
            })
            .child(left)
            .child(canvas)
            .child_if(d.popover_open, || {
                el("div")
                    .class("config-popover")
                    .child(
                        el("div")
                            .class("form-group")
                            .child(el("label").text("Reference Name"))
                            .child(el("input").field(Field::Reference)),
                    )
                    .child(
                        el("div")
                            .class("form-group")
                            .child(el("label").text("Path"))
                            .child(el("input").field(Field::Path)),
                    )
                    .child(
                        el("button")
                            .testid("close-config-popover")
                            .text("×")
                            .on_click(Action::CloseNodeConfig),
                    )
            })
            .child_if(d.config_open, || {
                el("div")
                    .class("pipeline-config-modal")
                    .child(toggle("Instrumentation", d.pending_instrumentation, Some(Action::ToggleInstrumentation)))
                    .child(toggle("Stats", d.stats, Some(Action::ToggleStats)))
                    .child(
                        el("button")
                            .testid("config-apply-close")
                            .text("Save")
                            .on_click(Action::ApplyConfig),
                    )
            })
    }

    fn render_view(&self, body: Node, name: &str) -> Node {
        let Some(pipeline) = self.deployed.get(name) else {
            return body.child(el("h2").text("Pipeline not found"));
        };
        let v = &self.view;

        body.child(
            el("div")
                .class("pipeline-details-header")
                .child(el("h1").class("pipeline-title").text(pipeline.name.clone()))
                .child(
                    el("div")
                        .class("pipeline-actions-popper")
                        .text("Actions")
                        .on_click(Action::OpenActions),
                )
                .child_if(v.actions_open, || {
                    el("ul").class("actions-menu").child(
                        el("li")
                            .testid("delete-pipeline")
                            .text("Delete")
                            .on_click(Action::DeleteRequest),
                    )
                })
                .child(el("button").class("btn").text("Configure").on_click(Action::OpenModeless)),
        )
        .child(
            el("div").class("canvas").child(
                el("div")
                    .class("node")
                    .child(el("span").class("node-name").text("File Delete"))
                    .child(el("span").class("node-type").text(pipeline.stage.clone())),
            ),
        )
        .child_if(v.modeless_open, || {
            el("div")
                .class("modeless")
                .child(
                    el("div")
                        .class("tabs")
                        .child(el("div").class("tab").text("Compute config"))
                        .child(
                            el("div")
                                .class("tab")
                                .text("Pipeline config")
                                .on_click(Action::PipelineConfigTab),
                        ),
                )
                .child_if(v.pipeline_tab, || toggle("Instrumentation", pipeline.instrumentation, None))
                .child(
                    el("button")
                        .testid("close-modeless")
                        .text("Close")
                        .on_click(Action::CloseModeless),
                )
        })
        .child_if(v.confirm_open, || {
            el("div")
                .testid("confirmation-modal")
                .child(el("p").text(format!("Are you sure you want to delete {}?", pipeline.name)))
                .child(
                    el("button")
                        .class("btn")
                        .class("btn-primary")
                        .text("Delete")
                        .on_click(Action::ConfirmDelete),
                )
                .child(
                    el("button")
                        .class("btn")
                        .class("btn-secondary")
                        .text("Cancel")
                        .on_click(Action::CancelDelete),
                )
        })
    }

    fn render_list(&self, body: Node) -> Node {
        let mut list = el("div").class("pipeline-list").child(el("h2").text("Deployed pipelines"));
        for name in self.deployed.keys() {
            list = list.child(el("div").class("pipeline-row").child(el("a").text(name.clone())));
        }
        body.child(list)
    }

    fn element_ref(&self, idx: usize) -> ElementRef {
        ElementRef::new(format!("{}:{}", self.generation, idx))
    }

    fn resolve_ref(&self, element: &ElementRef, flat: &[Flat]) -> Result<usize> {
        let stale = || {
            Error::webdriver(
                "stale element reference",
                &format!("element {} is no longer attached", element.id()),
            )
        };
        let (generation, idx) = element.id().split_once(':').ok_or_else(stale)?;
        let generation: u64 = generation.parse().map_err(|_| stale())?;
        let idx: usize = idx.parse().map_err(|_| stale())?;
        if generation != self.generation || idx >= flat.len() {
            return Err(stale());
        }
        Ok(idx)
    }
}

fn toggle(label: &'static str, on: bool, action: Option<Action>) -> Node {
    let mut switch = el("div").class("toggle-switch");
    if let Some(action) = action {
        switch = switch.on_click(action);
    }
    el("div")
        .class("label-with-toggle")
        .child(el("span").text(label))
        .child(switch)
        .child(el("span").class("toggle-label").text(if on { "On" } else { "Off" }))
}

#[async_trait]
impl Browser for Studio {
    async fn navigate(&mut self, url: &str) -> Result<()> {
        if !self.reachable || !url.starts_with(BASE) {
            return Err(Error::webdriver(
                "unknown error",
                &format!("net::ERR_CONNECTION_REFUSED loading {}", url),
            ));
        }
        let path = url[BASE.len()..].trim_end_matches('/');
        let page = match path {
            "" => Page::Home,
            "/pipelines/studio" => Page::Studio,
            "/pipelines" => Page::List,
            p => match p.strip_prefix("/pipelines/view/") {
                Some(name) => Page::View(name.to_string()),
                None => Page::Home,
            },
        };
        self.go(page);
        Ok(())
    }

    async fn current_url(&mut self) -> Result<String> {
        Ok(self.url.clone())
    }

    async fn find_all(
        &mut self,
        locator: &Locator,
        scope: Option<&ElementRef>,
    ) -> Result<Vec<ElementRef>> {
        if self.resource_center_open {
            self.finds_since_open += 1;
            if self.finds_since_open == self.resource_center_delay {
                self.generation += 1;
            }
        }

        let flat = flatten(self.render());
        let scope_idx = match scope {
            Some(element) => Some(self.resolve_ref(element, &flat)?),
            None => None,
        };
        let in_scope = |i: usize, include_self: bool| match scope_idx {
            None => true,
            Some(s) => (include_self && i == s) || is_descendant(&flat, i, s),
        };

        let matches: Vec<usize> = match locator {
            Locator::Css(sel) => {
                let selector = parse_selector(sel)?;
                (0..flat.len())
                    .filter(|&i| in_scope(i, false) && selector.matches(&flat[i].node))
                    .collect()
            }
            Locator::ContainsText(text) => (0..flat.len())
                .filter(|&i| in_scope(i, true) && flat[i].node.text.contains(text.as_str()))
                .collect(),
            Locator::Parent => scope_idx.and_then(|s| flat[s].parent).into_iter().collect(),
        };

        Ok(matches.into_iter().map(|i| self.element_ref(i)).collect())
    }

    async fn click(&mut self, element: &ElementRef) -> Result<()> {
        let flat = flatten(self.render());
        let mut idx = self.resolve_ref(element, &flat)?;

        if self.stale_clicks > 0 {
            self.stale_clicks -= 1;
            self.generation += 1;
            return Err(Error::webdriver(
                "stale element reference",
                "page re-rendered before the click",
            ));
        }
        if flat[idx].node.hidden {
            return Err(Error::webdriver(
                "element not interactable",
                "element has zero size",
            ));
        }

        loop {
            if let Some(action) = flat[idx].node.on_click {
                self.apply(action);
                return Ok(());
            }
            match flat[idx].parent {
                Some(parent) => idx = parent,
                None => return Ok(()),
            }
        }
    }

    async fn send_keys(&mut self, element: &ElementRef, text: &str) -> Result<()> {
        let flat = flatten(self.render());
        let idx = self.resolve_ref(element, &flat)?;
        let field = flat[idx].node.field.ok_or_else(|| {
            Error::webdriver("element not interactable", "element is not editable")
        })?;

        for c in text.chars() {
            if c == keys::ENTER {
                if field == Field::PipelineName {
                    self.draft.name = self.draft.name_input.trim().to_string();
                    self.draft.name_editing = false;
                }
            } else if ('\u{E000}'..='\u{F8FF}').contains(&c) {
                // other special keys do nothing here
            } else {
                self.field_mut(field).push(c);
            }
        }
        self.generation += 1;
        Ok(())
    }

    async fn clear(&mut self, element: &ElementRef) -> Result<()> {
        let flat = flatten(self.render());
        let idx = self.resolve_ref(element, &flat)?;
        if let Some(field) = flat[idx].node.field {
            self.field_mut(field).clear();
            self.generation += 1;
        }
        Ok(())
    }

    async fn show(&mut self, element: &ElementRef) -> Result<()> {
        let flat = flatten(self.render());
        let idx = self.resolve_ref(element, &flat)?;
        self.shown.extend(flat[idx].node.classes.iter().copied());
        self.generation += 1;
        Ok(())
    }

    async fn screenshot(&mut self) -> Result<Vec<u8>> {
        Ok(b"\x89PNG\r\n\x1a\nstudio".to_vec())
    }

    async fn close(&mut self) -> Result<()> {
        self.closed = true;
        Ok(())
    }
}
