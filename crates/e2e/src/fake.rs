//! In-memory TodoMVC subject
//!
//! [`FakeTodoApp`] implements [`Driver`] over a small model of the TodoMVC
//! page: the rendered element tree, keyboard focus and text selection, and a
//! per-instance `localStorage`. It lets the executor, the assertion helpers
//! and the shipped scenarios be exercised without a browser. [`Quirks`]
//! inject subject defects so the harness can be tested for catching them.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

use crate::driver::{text_matches, Driver, DriverFactory, ElementHandle, Selector};
use crate::error::{HarnessError, HarnessResult};
use crate::keys::{Chord, Platform};
use crate::scenario::NEW_TODO_PLACEHOLDER;
use crate::storage::{Filter, TodoId, TodoRecord, DEFAULT_STORAGE_KEY};

/// Defects the fake subject can be told to exhibit.
#[derive(Debug, Clone, Default)]
pub struct Quirks {
    /// Store titles without trimming
    pub skip_trim: bool,
    /// Create/keep records whose title is blank
    pub accept_blank: bool,
    /// Delay every storage write by this much (debounced)
    pub persist_delay: Option<Duration>,
    /// Write garbage instead of JSON
    pub corrupt_storage: bool,
    /// Never write storage at all
    pub never_persist: bool,
    /// Lose storage when the page reloads
    pub volatile_storage: bool,
    /// Fail every navigation
    pub unreachable: bool,
}

#[derive(Debug, Clone)]
pub struct FakeConfig {
    /// Keyboard convention the fake honours for "select all"
    pub platform: Platform,
    pub storage_key: String,
    pub quirks: Quirks,
}

impl Default for FakeConfig {
    fn default() -> Self {
        Self {
            platform: Platform::host(),
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            quirks: Quirks::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Node {
    NewTodo,
    ToggleAll,
    ToggleAllLabel,
    Item(usize),
    Toggle(usize),
    Title(usize),
    Destroy(usize),
    EditInput(usize),
    TodoCount,
    FilterLink(Filter),
    ClearCompleted,
}

/// One rendered element with the attributes selectors look at.
#[derive(Debug, Clone)]
struct Element {
    node: Node,
    tag: &'static str,
    id_attr: Option<&'static str>,
    classes: Vec<&'static str>,
    role: Option<&'static str>,
    name: String,
    aria_label: Option<String>,
    placeholder: Option<&'static str>,
    test_id: Option<&'static str>,
    text: String,
    visible: bool,
    checked: Option<bool>,
}

impl Element {
    fn new(node: Node, tag: &'static str) -> Self {
        Self {
            node,
            tag,
            id_attr: None,
            classes: Vec::new(),
            role: None,
            name: String::new(),
            aria_label: None,
            placeholder: None,
            test_id: None,
            text: String::new(),
            visible: true,
            checked: None,
        }
    }

    fn is_input(&self) -> bool {
        self.tag == "input"
    }
}

#[derive(Debug, Clone, Default)]
struct TextField {
    value: String,
    all_selected: bool,
}

impl TextField {
    fn set(&mut self, value: &str) {
        self.value = value.to_string();
        self.all_selected = false;
    }

    fn insert(&mut self, text: &str) {
        if self.all_selected {
            self.value.clear();
            self.all_selected = false;
        }
        self.value.push_str(text);
    }

    fn erase_back(&mut self) {
        if self.all_selected {
            self.value.clear();
            self.all_selected = false;
        } else {
            self.value.pop();
        }
    }

    fn erase_forward(&mut self) {
        // Caret sits at the end, so Delete only acts on a selection.
        if self.all_selected {
            self.value.clear();
            self.all_selected = false;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Focus {
    Nothing,
    NewTodo,
    Edit,
}

#[derive(Debug)]
struct Editing {
    id: TodoId,
    field: TextField,
}

#[derive(Debug)]
struct AppState {
    cfg: FakeConfig,
    loaded: bool,
    url: String,
    todos: Vec<TodoRecord>,
    next_id: u64,
    filter: Filter,
    new_todo: TextField,
    editing: Option<Editing>,
    hovered: Option<TodoId>,
    focus: Focus,
    storage: HashMap<String, String>,
    pending_write: Option<(Instant, String)>,
}

impl AppState {
    fn new(cfg: FakeConfig) -> Self {
        Self {
            cfg,
            loaded: false,
            url: String::new(),
            todos: Vec::new(),
            next_id: 1,
            filter: Filter::All,
            new_todo: TextField::default(),
            editing: None,
            hovered: None,
            focus: Focus::Nothing,
            storage: HashMap::new(),
            pending_write: None,
        }
    }

    fn ensure_loaded(&self, action: &str) -> HarnessResult<()> {
        if self.loaded {
            Ok(())
        } else {
            Err(HarnessError::driver(action, "no page loaded"))
        }
    }

    fn load(&mut self, url: &str) -> HarnessResult<()> {
        if self.cfg.quirks.unreachable {
            return Err(HarnessError::driver("navigate", "net::ERR_NAME_NOT_RESOLVED"));
        }
        if !(url.starts_with("http://") || url.starts_with("https://") || url.starts_with("file://")) {
            return Err(HarnessError::driver("navigate", format!("net::ERR_INVALID_URL {}", url)));
        }

        // Unloading the page drops a write that has not fired yet.
        self.flush_due_write();
        self.pending_write = None;
        if self.cfg.quirks.volatile_storage {
            self.storage.clear();
        }

        self.loaded = true;
        self.url = url.to_string();
        self.filter = Filter::from_route(url);
        self.new_todo = TextField::default();
        self.editing = None;
        self.hovered = None;
        self.focus = Focus::Nothing;
        self.todos = self
            .storage
            .get(&self.cfg.storage_key)
            .and_then(|raw| serde_json::from_str::<Vec<TodoRecord>>(raw).ok())
            .unwrap_or_default();
        Ok(())
    }

    fn flush_due_write(&mut self) {
        let due = matches!(&self.pending_write, Some((at, _)) if Instant::now() >= *at);
        if due {
            if let Some((_, value)) = self.pending_write.take() {
                self.storage.insert(self.cfg.storage_key.clone(), value);
            }
        }
    }

    fn persist(&mut self) {
        let quirks = &self.cfg.quirks;
        if quirks.never_persist {
            return;
        }
        let value = if quirks.corrupt_storage {
            "{\"todos\": [".to_string()
        } else {
            match serde_json::to_string(&self.todos) {
                Ok(v) => v,
                Err(_) => return,
            }
        };
        match quirks.persist_delay {
            Some(delay) => self.pending_write = Some((Instant::now() + delay, value)),
            None => {
                self.storage.insert(self.cfg.storage_key.clone(), value);
            }
        }
    }

    fn normalize_title(&self, raw: &str) -> Option<String> {
        let title = if self.cfg.quirks.skip_trim {
            raw.to_string()
        } else {
            raw.trim().to_string()
        };
        if title.trim().is_empty() && !self.cfg.quirks.accept_blank {
            None
        } else {
            Some(title)
        }
    }

    fn index_of(&self, id: &TodoId) -> Option<usize> {
        self.todos.iter().position(|t| &t.id == id)
    }

    fn render(&self) -> Vec<Element> {
        let mut out = Vec::new();

        let mut input = Element::new(Node::NewTodo, "input");
        input.classes = vec!["new-todo"];
        input.role = Some("textbox");
        input.name = NEW_TODO_PLACEHOLDER.to_string();
        input.placeholder = Some(NEW_TODO_PLACEHOLDER);
        input.test_id = Some("text-input");
        out.push(input);

        if self.todos.is_empty() {
            return out;
        }

        let all_done = self.todos.iter().all(|t| t.completed);
        let mut toggle_all = Element::new(Node::ToggleAll, "input");
        toggle_all.id_attr = Some("toggle-all");
        toggle_all.classes = vec!["toggle-all"];
        toggle_all.role = Some("checkbox");
        toggle_all.name = "Mark all as complete".to_string();
        toggle_all.checked = Some(all_done);
        out.push(toggle_all);

        let mut toggle_label = Element::new(Node::ToggleAllLabel, "label");
        toggle_label.text = "Mark all as complete".to_string();
        toggle_label.checked = Some(all_done);
        out.push(toggle_label);

        for (i, todo) in self.todos.iter().enumerate() {
            if !self.filter.admits(todo) {
                continue;
            }
            let editing = self.editing.as_ref().map(|e| e.id == todo.id).unwrap_or(false);
            let hovered = self.hovered.as_ref() == Some(&todo.id);

            let mut item = Element::new(Node::Item(i), "li");
            item.classes = match (todo.completed, editing) {
                (true, true) => vec!["completed", "editing"],
                (true, false) => vec!["completed"],
                (false, true) => vec!["editing"],
                (false, false) => vec![],
            };
            item.role = Some("listitem");
            item.test_id = Some("todo-item");
            out.push(item);

            let mut toggle = Element::new(Node::Toggle(i), "input");
            toggle.classes = vec!["toggle"];
            toggle.role = Some("checkbox");
            toggle.name = "Toggle Todo".to_string();
            toggle.aria_label = Some("Toggle Todo".to_string());
            toggle.checked = Some(todo.completed);
            toggle.visible = !editing;
            out.push(toggle);

            let mut title = Element::new(Node::Title(i), "label");
            title.test_id = Some("todo-title");
            title.text = todo.title.clone();
            title.visible = !editing;
            out.push(title);

            let mut destroy = Element::new(Node::Destroy(i), "button");
            destroy.classes = vec!["destroy"];
            destroy.role = Some("button");
            destroy.name = "Delete".to_string();
            destroy.aria_label = Some("Delete".to_string());
            destroy.visible = hovered && !editing;
            out.push(destroy);

            if editing {
                let mut edit = Element::new(Node::EditInput(i), "input");
                edit.classes = vec!["edit"];
                edit.role = Some("textbox");
                edit.name = "Edit".to_string();
                out.push(edit);
            }
        }

        let active = self.todos.iter().filter(|t| !t.completed).count();
        let mut count = Element::new(Node::TodoCount, "span");
        count.test_id = Some("todo-count");
        count.text = format!("{} item{} left", active, if active == 1 { "" } else { "s" });
        out.push(count);

        for filter in [Filter::All, Filter::Active, Filter::Completed] {
            let mut link = Element::new(Node::FilterLink(filter), "a");
            link.role = Some("link");
            link.name = filter.link_name().to_string();
            link.text = filter.link_name().to_string();
            if filter == self.filter {
                link.classes = vec!["selected"];
            }
            out.push(link);
        }

        let mut clear = Element::new(Node::ClearCompleted, "button");
        clear.classes = vec!["clear-completed"];
        clear.role = Some("button");
        clear.name = "Clear completed".to_string();
        clear.text = "Clear completed".to_string();
        clear.visible = self.todos.iter().any(|t| t.completed);
        out.push(clear);

        out
    }

    fn focused_field(&mut self) -> Option<&mut TextField> {
        match self.focus {
            Focus::Nothing => None,
            Focus::NewTodo => Some(&mut self.new_todo),
            Focus::Edit => self.editing.as_mut().map(|e| &mut e.field),
        }
    }

    /// Inputs take focus; other elements leave focus where it is.
    fn focus_on(&mut self, node: Node) {
        match node {
            Node::NewTodo => self.focus = Focus::NewTodo,
            Node::EditInput(_) => self.focus = Focus::Edit,
            _ => {}
        }
    }

    fn field_for(&mut self, node: Node, action: &str) -> HarnessResult<&mut TextField> {
        match node {
            Node::NewTodo => Ok(&mut self.new_todo),
            Node::EditInput(_) => self
                .editing
                .as_mut()
                .map(|e| &mut e.field)
                .ok_or_else(|| HarnessError::driver(action, "edit field is gone")),
            _ => Err(HarnessError::driver(
                action,
                "Element is not an <input>, <textarea> or [contenteditable] element",
            )),
        }
    }

    fn press(&mut self, key: &str) {
        let chord = Chord::parse(key);
        let platform = self.cfg.platform;

        if chord.modifiers.is_empty() {
            match (chord.key.as_str(), self.focus) {
                ("Enter", Focus::NewTodo) => return self.submit_new(),
                ("Enter", Focus::Edit) => return self.commit_edit(),
                ("Escape", Focus::Edit) => return self.cancel_edit(),
                _ => {}
            }
        }

        let Some(field) = self.focused_field() else {
            return;
        };
        if chord.is_select_all(platform) {
            field.all_selected = true;
        } else if !chord.modifiers.is_empty() {
            // Any other chord (e.g. Control+A on macOS) just moves the caret.
            field.all_selected = false;
        } else {
            match chord.key.as_str() {
                "Backspace" => field.erase_back(),
                "Delete" => field.erase_forward(),
                k if k.chars().count() == 1 => field.insert(k),
                _ => {}
            }
        }
    }

    fn type_text(&mut self, text: &str) {
        if let Some(field) = self.focused_field() {
            for ch in text.chars() {
                field.insert(&ch.to_string());
            }
        }
    }

    fn submit_new(&mut self) {
        let Some(title) = self.normalize_title(&self.new_todo.value) else {
            return;
        };
        let id = TodoId::Text(format!("fake-{:04}", self.next_id));
        self.next_id += 1;
        self.todos.push(TodoRecord {
            id,
            title,
            completed: false,
        });
        self.new_todo = TextField::default();
        self.persist();
    }

    fn begin_edit(&mut self, index: usize) {
        let todo = &self.todos[index];
        self.editing = Some(Editing {
            id: todo.id.clone(),
            field: TextField {
                value: todo.title.clone(),
                all_selected: false,
            },
        });
        self.focus = Focus::Edit;
    }

    fn commit_edit(&mut self) {
        let Some(edit) = self.editing.take() else {
            return;
        };
        self.focus = Focus::Nothing;
        let Some(index) = self.index_of(&edit.id) else {
            return;
        };
        match self.normalize_title(&edit.field.value) {
            Some(title) => self.todos[index].title = title,
            None => {
                self.todos.remove(index);
            }
        }
        self.persist();
    }

    fn cancel_edit(&mut self) {
        self.editing = None;
        self.focus = Focus::Nothing;
    }

    fn toggle_all(&mut self) {
        let target = !self.todos.iter().all(|t| t.completed);
        for todo in &mut self.todos {
            todo.completed = target;
        }
        self.persist();
    }

    fn click(&mut self, node: Node) {
        self.focus_on(node);
        match node {
            Node::ToggleAll | Node::ToggleAllLabel => self.toggle_all(),
            Node::Toggle(i) => {
                self.todos[i].completed = !self.todos[i].completed;
                self.persist();
            }
            Node::Destroy(i) => {
                self.todos.remove(i);
                self.hovered = None;
                self.persist();
            }
            Node::FilterLink(filter) => {
                self.filter = filter;
                let base = self.url.split('#').next().unwrap_or_default().trim_end_matches('/');
                self.url = format!("{}/{}", base, filter.route());
            }
            Node::ClearCompleted => {
                self.todos.retain(|t| !t.completed);
                self.persist();
            }
            Node::NewTodo
            | Node::Item(_)
            | Node::Title(_)
            | Node::EditInput(_)
            | Node::TodoCount => {}
        }
    }

    fn hover(&mut self, node: Node) {
        self.hovered = match node {
            Node::Item(i) | Node::Toggle(i) | Node::Title(i) | Node::Destroy(i) => {
                Some(self.todos[i].id.clone())
            }
            _ => None,
        };
    }
}

fn css_matches(el: &Element, css: &str) -> HarnessResult<bool> {
    if css.is_empty()
        || css.contains(|c: char| c.is_whitespace() || matches!(c, '>' | ':' | '[' | '+' | '~' | ','))
    {
        return Err(HarnessError::InvalidTarget(format!(
            "fake subject supports only tag/#id/.class selectors, got '{}'",
            css
        )));
    }

    let mut parts = css.split('.');
    let head = parts.next().unwrap_or_default();
    let (tag, id) = match head.split_once('#') {
        Some((tag, id)) => (tag, Some(id)),
        None => (head, None),
    };
    if !tag.is_empty() && tag != el.tag {
        return Ok(false);
    }
    if let Some(id) = id {
        if el.id_attr != Some(id) {
            return Ok(false);
        }
    }
    for class in parts {
        if !el.classes.contains(&class) {
            return Ok(false);
        }
    }
    Ok(true)
}

fn matches(el: &Element, target: &ElementHandle) -> HarnessResult<bool> {
    let exact = target.exact;
    Ok(match &target.selector {
        Selector::Role { role, name } => {
            el.role == Some(role.as_str())
                && name.as_ref().map_or(true, |n| text_matches(n, &el.name, exact))
        }
        Selector::Placeholder(v) => el.placeholder.map_or(false, |p| text_matches(v, p, exact)),
        Selector::TestId(v) => el.test_id == Some(v.as_str()),
        Selector::Text(v) => !el.is_input() && !el.text.is_empty() && text_matches(v, &el.text, exact),
        Selector::Label(v) => el.aria_label.as_deref().map_or(false, |l| text_matches(v, l, exact)),
        Selector::Css(v) => css_matches(el, v)?,
    })
}

fn select(elements: &[Element], target: &ElementHandle) -> HarnessResult<Vec<Element>> {
    let mut matched = Vec::new();
    for el in elements {
        if matches(el, target)? {
            matched.push(el.clone());
        }
    }
    Ok(match target.nth {
        Some(n) => matched.into_iter().nth(n).into_iter().collect(),
        None => matched,
    })
}

fn resolve_one(
    elements: &[Element],
    target: &ElementHandle,
    action: &str,
    require_visible: bool,
) -> HarnessResult<Element> {
    let mut matched = select(elements, target)?;
    match matched.len() {
        0 => Err(HarnessError::ElementNotFound {
            action: action.to_string(),
            selector: target.to_string(),
        }),
        1 => {
            let el = matched.remove(0);
            if require_visible && !el.visible {
                Err(HarnessError::ElementNotFound {
                    action: action.to_string(),
                    selector: format!("{} (hidden)", target),
                })
            } else {
                Ok(el)
            }
        }
        n => Err(HarnessError::driver(
            action,
            format!("strict mode violation: {} resolved to {} elements", target, n),
        )),
    }
}

/// One isolated fake page with its own storage.
pub struct FakeTodoApp {
    state: Mutex<AppState>,
}

impl FakeTodoApp {
    pub fn new(config: FakeConfig) -> Self {
        Self {
            state: Mutex::new(AppState::new(config)),
        }
    }

    /// Write a raw storage entry, as devtools would.
    pub async fn set_storage_item(&self, key: &str, value: &str) {
        self.state
            .lock()
            .await
            .storage
            .insert(key.to_string(), value.to_string());
    }

    /// Current page URL.
    pub async fn url(&self) -> String {
        self.state.lock().await.url.clone()
    }
}

impl Default for FakeTodoApp {
    fn default() -> Self {
        Self::new(FakeConfig::default())
    }
}

#[async_trait::async_trait]
impl Driver for FakeTodoApp {
    async fn navigate(&self, url: &str) -> HarnessResult<()> {
        debug!("fake navigate {}", url);
        self.state.lock().await.load(url)
    }

    async fn type_text(&self, target: &ElementHandle, text: &str) -> HarnessResult<()> {
        let mut st = self.state.lock().await;
        st.ensure_loaded("type")?;
        let el = resolve_one(&st.render(), target, "type", false)?;
        st.focus_on(el.node);
        st.type_text(text);
        Ok(())
    }

    async fn fill(&self, target: &ElementHandle, value: &str) -> HarnessResult<()> {
        let mut st = self.state.lock().await;
        st.ensure_loaded("fill")?;
        let el = resolve_one(&st.render(), target, "fill", true)?;
        st.field_for(el.node, "fill")?.set(value);
        st.focus_on(el.node);
        Ok(())
    }

    async fn clear(&self, target: &ElementHandle) -> HarnessResult<()> {
        let mut st = self.state.lock().await;
        st.ensure_loaded("clear")?;
        let el = resolve_one(&st.render(), target, "clear", true)?;
        st.field_for(el.node, "clear")?.set("");
        st.focus_on(el.node);
        Ok(())
    }

    async fn press_key(&self, target: &ElementHandle, key: &str) -> HarnessResult<()> {
        let mut st = self.state.lock().await;
        st.ensure_loaded("press")?;
        let el = resolve_one(&st.render(), target, "press", false)?;
        st.focus_on(el.node);
        st.press(key);
        Ok(())
    }

    async fn click(&self, target: &ElementHandle) -> HarnessResult<()> {
        let mut st = self.state.lock().await;
        st.ensure_loaded("click")?;
        let el = resolve_one(&st.render(), target, "click", true)?;
        st.click(el.node);
        Ok(())
    }

    async fn dblclick(&self, target: &ElementHandle) -> HarnessResult<()> {
        let mut st = self.state.lock().await;
        st.ensure_loaded("dblclick")?;
        let el = resolve_one(&st.render(), target, "dblclick", true)?;
        match el.node {
            Node::Title(i) => st.begin_edit(i),
            node => {
                st.click(node);
                st.click(node);
            }
        }
        Ok(())
    }

    async fn hover(&self, target: &ElementHandle) -> HarnessResult<()> {
        let mut st = self.state.lock().await;
        st.ensure_loaded("hover")?;
        let el = resolve_one(&st.render(), target, "hover", true)?;
        st.hover(el.node);
        Ok(())
    }

    async fn set_checked(&self, target: &ElementHandle, checked: bool) -> HarnessResult<()> {
        let action = if checked { "check" } else { "uncheck" };
        let mut st = self.state.lock().await;
        st.ensure_loaded(action)?;
        let el = resolve_one(&st.render(), target, action, true)?;
        let current = el
            .checked
            .ok_or_else(|| HarnessError::driver(action, "Not a checkbox or radio button"))?;
        if current == checked {
            return Ok(());
        }
        st.click(el.node);

        let after = resolve_one(&st.render(), target, action, false)
            .ok()
            .and_then(|e| e.checked);
        if after != Some(checked) {
            return Err(HarnessError::driver(
                action,
                "Clicking the checkbox did not change its state",
            ));
        }
        Ok(())
    }

    async fn reload(&self) -> HarnessResult<()> {
        let mut st = self.state.lock().await;
        st.ensure_loaded("reload")?;
        let url = st.url.clone();
        st.load(&url)
    }

    async fn read_text(&self, target: &ElementHandle) -> HarnessResult<Vec<String>> {
        let st = self.state.lock().await;
        st.ensure_loaded("read_text")?;
        Ok(select(&st.render(), target)?
            .into_iter()
            .map(|el| el.text)
            .collect())
    }

    async fn read_count(&self, target: &ElementHandle) -> HarnessResult<usize> {
        let st = self.state.lock().await;
        st.ensure_loaded("read_count")?;
        Ok(select(&st.render(), target)?.len())
    }

    async fn is_checked(&self, target: &ElementHandle) -> HarnessResult<bool> {
        let st = self.state.lock().await;
        st.ensure_loaded("is_checked")?;
        let el = resolve_one(&st.render(), target, "is_checked", false)?;
        el.checked
            .ok_or_else(|| HarnessError::driver("is_checked", "Not a checkbox or radio button"))
    }

    async fn is_visible(&self, target: &ElementHandle) -> HarnessResult<bool> {
        let st = self.state.lock().await;
        st.ensure_loaded("is_visible")?;
        Ok(select(&st.render(), target)?
            .first()
            .map(|el| el.visible)
            .unwrap_or(false))
    }

    async fn storage_item(&self, key: &str) -> HarnessResult<Option<String>> {
        let mut st = self.state.lock().await;
        st.ensure_loaded("storage_item")?;
        st.flush_due_write();
        Ok(st.storage.get(key).cloned())
    }

    async fn settle(&self) -> HarnessResult<()> {
        tokio::task::yield_now().await;
        Ok(())
    }
}

/// Hands out a fresh [`FakeTodoApp`] per scenario.
#[derive(Debug, Default)]
pub struct FakeBrowser {
    config: FakeConfig,
    launched: AtomicUsize,
}

impl FakeBrowser {
    pub fn new(config: FakeConfig) -> Self {
        Self {
            config,
            launched: AtomicUsize::new(0),
        }
    }

    pub fn with_quirks(quirks: Quirks) -> Self {
        Self::new(FakeConfig {
            quirks,
            ..Default::default()
        })
    }

    /// Number of instances handed out so far.
    pub fn launched(&self) -> usize {
        self.launched.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl DriverFactory for FakeBrowser {
    type Driver = FakeTodoApp;

    async fn launch(&self) -> HarnessResult<FakeTodoApp> {
        self.launched.fetch_add(1, Ordering::SeqCst);
        Ok(FakeTodoApp::new(self.config.clone()))
    }
}
