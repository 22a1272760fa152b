//! The locally held copy of a user's data plus the view settings of the task list.
//!
//! Services only touch the board after the backend has confirmed a change, by applying a
//! [BoardEvent]. Everything the task list shows (filtered and sorted tasks, sidebar counts) is
//! derived from the board on demand, so it can never drift from the applied events.

use crate::domain::NotSignedIn;
use crate::domain::auth::User;
use crate::domain::board::driving_ports::BoardError;
use crate::domain::category::Category;
use crate::domain::category::driven_ports::CategoryReader;
use crate::domain::profile::Profile;
use crate::domain::profile::driven_ports::ProfileReader;
use crate::domain::todo::Todo;
use crate::domain::todo::driven_ports::TodoReader;
use crate::external_connections::ExternalConnectivity;
use derive_more::Display;
use std::collections::HashMap;
use thiserror::Error;
use tracing::{error, info};
use uuid::Uuid;

/// Which tasks the list shows, by category
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CategoryFilter {
    #[default]
    All,
    /// Tasks with no category
    Uncategorized,
    Category(Uuid),
}

impl CategoryFilter {
    fn admits(&self, todo: &Todo) -> bool {
        match self {
            Self::All => true,
            Self::Uncategorized => todo.category_id.is_none(),
            Self::Category(id) => todo.category_id == Some(*id),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Display, clap::ValueEnum)]
pub enum SortKey {
    #[default]
    #[display("created")]
    Created,
    #[display("title")]
    Title,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Display, clap::ValueEnum)]
pub enum SortDirection {
    #[default]
    #[display("asc")]
    Asc,
    #[display("desc")]
    Desc,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ViewOptions {
    pub filter: CategoryFilter,
    pub search: String,
    pub sort_key: SortKey,
    pub direction: SortDirection,
}

/// Sidebar numbers. Always computed over every task, regardless of the active filter or search.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TodoCounts {
    pub total: usize,
    pub active: usize,
    pub completed: usize,
    pub uncategorized: usize,
    pub by_category: HashMap<Uuid, usize>,
}

impl TodoCounts {
    pub fn for_category(&self, id: Uuid) -> usize {
        self.by_category.get(&id).copied().unwrap_or(0)
    }
}

/// A change the backend has already accepted
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BoardEvent {
    TodoAdded(Todo),
    TodoCompletionSet { id: Uuid, completed: bool },
    TodoTextChanged { id: Uuid, text: String },
    TodoCategorySet { id: Uuid, category_id: Option<Uuid> },
    TodoDeleted(Uuid),
    CategoryAdded(Category),
    CategoryChanged { id: Uuid, name: String, color: String },
    CategoryDeleted(Uuid),
    ProfileSaved(Profile),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LookupError {
    #[error("nothing matches \"{0}\"")]
    NoMatch(String),
    #[error("\"{0}\" matches more than one item, use more of the id")]
    Ambiguous(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TaskBoard {
    user: User,
    todos: Vec<Todo>,
    categories: Vec<Category>,
    profile: Option<Profile>,
    view: ViewOptions,
}

impl TaskBoard {
    pub fn new(
        user: User,
        todos: Vec<Todo>,
        categories: Vec<Category>,
        profile: Option<Profile>,
    ) -> Self {
        TaskBoard {
            user,
            todos,
            categories,
            profile,
            view: ViewOptions::default(),
        }
    }

    pub fn user(&self) -> &User {
        &self.user
    }

    pub fn todos(&self) -> &[Todo] {
        &self.todos
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn profile(&self) -> Option<&Profile> {
        self.profile.as_ref()
    }

    pub fn view(&self) -> &ViewOptions {
        &self.view
    }

    pub fn todo(&self, id: Uuid) -> Option<&Todo> {
        self.todos.iter().find(|todo| todo.id == id)
    }

    pub fn category(&self, id: Uuid) -> Option<&Category> {
        self.categories.iter().find(|category| category.id == id)
    }

    pub fn set_filter(&mut self, filter: CategoryFilter) {
        self.view.filter = filter;
    }

    pub fn set_search(&mut self, search: impl Into<String>) {
        self.view.search = search.into();
    }

    pub fn set_sort(&mut self, sort_key: SortKey, direction: SortDirection) {
        self.view.sort_key = sort_key;
        self.view.direction = direction;
    }

    /// Applies a change the backend has confirmed. Events naming rows the board doesn't hold
    /// change nothing.
    pub fn apply(&mut self, event: BoardEvent) {
        match event {
            BoardEvent::TodoAdded(todo) => self.todos.push(todo),
            BoardEvent::TodoCompletionSet { id, completed } => {
                if let Some(todo) = self.todo_mut(id) {
                    todo.completed = completed;
                }
            }
            BoardEvent::TodoTextChanged { id, text } => {
                if let Some(todo) = self.todo_mut(id) {
                    todo.text = text;
                }
            }
            BoardEvent::TodoCategorySet { id, category_id } => {
                if let Some(todo) = self.todo_mut(id) {
                    todo.category_id = category_id;
                }
            }
            BoardEvent::TodoDeleted(id) => self.todos.retain(|todo| todo.id != id),
            BoardEvent::CategoryAdded(category) => self.categories.push(category),
            BoardEvent::CategoryChanged { id, name, color } => {
                if let Some(category) = self.categories.iter_mut().find(|cat| cat.id == id) {
                    category.name = name;
                    category.color = color;
                }
            }
            BoardEvent::CategoryDeleted(id) => {
                self.categories.retain(|category| category.id != id);
                // Mirrors the backend, which detaches rather than deletes the category's tasks
                for todo in self.todos.iter_mut() {
                    if todo.category_id == Some(id) {
                        todo.category_id = None;
                    }
                }
                if self.view.filter == CategoryFilter::Category(id) {
                    self.view.filter = CategoryFilter::All;
                }
            }
            BoardEvent::ProfileSaved(profile) => self.profile = Some(profile),
        }
    }

    fn todo_mut(&mut self, id: Uuid) -> Option<&mut Todo> {
        self.todos.iter_mut().find(|todo| todo.id == id)
    }

    /// The tasks the list shows: filtered by category, then by a case-insensitive search of the
    /// task text, then sorted. Descending order is exactly the reverse of ascending order.
    pub fn visible_todos(&self) -> Vec<&Todo> {
        let needle = self.view.search.to_lowercase();
        let mut visible: Vec<&Todo> = self
            .todos
            .iter()
            .filter(|todo| self.view.filter.admits(todo))
            .filter(|todo| needle.is_empty() || todo.text.to_lowercase().contains(&needle))
            .collect();

        match self.view.sort_key {
            SortKey::Created => visible.sort_by_key(|todo| todo.created_at),
            SortKey::Title => visible.sort_by(|left, right| left.text.cmp(&right.text)),
        }
        if self.view.direction == SortDirection::Desc {
            visible.reverse();
        }

        visible
    }

    pub fn counts(&self) -> TodoCounts {
        let mut counts = TodoCounts {
            total: self.todos.len(),
            ..TodoCounts::default()
        };

        for todo in &self.todos {
            if todo.completed {
                counts.completed += 1;
            } else {
                counts.active += 1;
            }

            match todo.category_id {
                Some(category_id) => *counts.by_category.entry(category_id).or_insert(0) += 1,
                None => counts.uncategorized += 1,
            }
        }

        counts
    }

    /// Finds the task whose id starts with [prefix]
    pub fn resolve_todo(&self, prefix: &str) -> Result<Uuid, LookupError> {
        resolve_prefix(prefix, self.todos.iter().map(|todo| todo.id))
    }

    /// Finds the category whose id starts with [prefix]
    pub fn resolve_category(&self, prefix: &str) -> Result<Uuid, LookupError> {
        resolve_prefix(prefix, self.categories.iter().map(|category| category.id))
    }
}

fn resolve_prefix(prefix: &str, ids: impl Iterator<Item = Uuid>) -> Result<Uuid, LookupError> {
    let wanted = prefix.trim().to_lowercase();
    if wanted.is_empty() {
        return Err(LookupError::NoMatch(prefix.to_owned()));
    }

    let mut matches = ids.filter(|id| id.to_string().starts_with(&wanted));
    match (matches.next(), matches.next()) {
        (Some(id), None) => Ok(id),
        (None, _) => Err(LookupError::NoMatch(prefix.to_owned())),
        (Some(_), Some(_)) => Err(LookupError::Ambiguous(prefix.to_owned())),
    }
}

pub mod driving_ports {
    use super::*;

    #[derive(Debug, Error)]
    pub enum BoardError {
        #[error(transparent)]
        NotSignedIn(#[from] NotSignedIn),
    }

    pub trait BoardPort {
        /// Fetches tasks, categories and the profile at the same time. A failed fetch is logged
        /// and leaves that part of the board empty.
        async fn load_board(
            &self,
            ext_cxn: &impl ExternalConnectivity,
            todo_read: &impl TodoReader,
            category_read: &impl CategoryReader,
            profile_read: &impl ProfileReader,
        ) -> Result<TaskBoard, BoardError>;
    }
}

pub struct BoardService;

impl driving_ports::BoardPort for BoardService {
    #[tracing::instrument(skip_all)]
    async fn load_board(
        &self,
        ext_cxn: &impl ExternalConnectivity,
        todo_read: &impl TodoReader,
        category_read: &impl CategoryReader,
        profile_read: &impl ProfileReader,
    ) -> Result<TaskBoard, BoardError> {
        let user = crate::domain::require_user(ext_cxn)?;

        let (todos_result, categories_result, profile_result) = tokio::join!(
            todo_read.todos(ext_cxn),
            category_read.categories(ext_cxn),
            profile_read.profile(user.id, ext_cxn),
        );

        let todos = todos_result.unwrap_or_else(|err| {
            error!("Error fetching todos: {err:#}");
            Vec::new()
        });
        let categories = categories_result.unwrap_or_else(|err| {
            error!("Error fetching categories: {err:#}");
            Vec::new()
        });
        let profile = profile_result.unwrap_or_else(|err| {
            error!("Error fetching profile: {err:#}");
            None
        });

        info!(
            todos = todos.len(),
            categories = categories.len(),
            has_profile = profile.is_some(),
            "board loaded"
        );
        Ok(TaskBoard::new(user, todos, categories, profile))
    }
}


#[cfg(test)]
mod tests {
    use super::test_util::*;
    use super::*;
    use speculoos::prelude::*;

    fn texts(todos: &[&Todo]) -> Vec<String> {
        todos.iter().map(|todo| todo.text.clone()).collect()
    }

    mod visible_todos {
        use super::*;

        #[test]
        fn uncategorized_filter_returns_only_null_categories() {
            let work = category_n(1, "Work");
            let mut board = board_with(
                vec![
                    todo_n(1, "Write report", Some(work.id)),
                    todo_n(2, "Buy milk", None),
                    todo_n(3, "Call mom", None),
                ],
                vec![work],
            );

            board.set_filter(CategoryFilter::Uncategorized);
            let visible = board.visible_todos();
            assert_eq!(vec!["Buy milk", "Call mom"], texts(&visible));
            assert!(visible.iter().all(|todo| todo.category_id.is_none()));
        }

        #[test]
        fn category_filter_matches_exact_id() {
            let work = category_n(1, "Work");
            let home = category_n(2, "Home");
            let mut board = board_with(
                vec![
                    todo_n(1, "Write report", Some(work.id)),
                    todo_n(2, "Vacuum", Some(home.id)),
                    todo_n(3, "Buy milk", None),
                    todo_n(4, "Review PR", Some(work.id)),
                ],
                vec![work.clone(), home],
            );

            board.set_filter(CategoryFilter::Category(work.id));
            assert_eq!(
                vec!["Write report", "Review PR"],
                texts(&board.visible_todos())
            );
        }

        #[test]
        fn search_ignores_case() {
            let mut board = board_with(
                vec![
                    todo_n(1, "Buy MILK", None),
                    todo_n(2, "Milkshake recipe", None),
                    todo_n(3, "Walk the dog", None),
                ],
                vec![],
            );

            board.set_search("milk");
            assert_eq!(
                vec!["Buy MILK", "Milkshake recipe"],
                texts(&board.visible_todos())
            );
        }

        #[test]
        fn search_applies_after_category_filter() {
            let work = category_n(1, "Work");
            let mut board = board_with(
                vec![
                    todo_n(1, "Email boss", Some(work.id)),
                    todo_n(2, "Email grandma", None),
                ],
                vec![work.clone()],
            );

            board.set_filter(CategoryFilter::Category(work.id));
            board.set_search("EMAIL");
            assert_eq!(vec!["Email boss"], texts(&board.visible_todos()));
        }

        #[test]
        fn title_sort_is_non_decreasing_and_desc_reverses_it() {
            let mut board = board_with(
                vec![
                    todo_n(1, "pay rent", None),
                    todo_n(2, "Buy milk", None),
                    todo_n(3, "call mom", None),
                    todo_n(4, "Buy milk", None),
                    todo_n(5, "answer email", None),
                ],
                vec![],
            );

            board.set_sort(SortKey::Title, SortDirection::Asc);
            let ascending: Vec<&Todo> = board.visible_todos();
            assert!(ascending.windows(2).all(|pair| pair[0].text <= pair[1].text));
            let ascending_ids: Vec<Uuid> = ascending.iter().map(|todo| todo.id).collect();

            board.set_sort(SortKey::Title, SortDirection::Desc);
            let mut descending_ids: Vec<Uuid> =
                board.visible_todos().iter().map(|todo| todo.id).collect();
            descending_ids.reverse();
            assert_eq!(ascending_ids, descending_ids);
        }

        #[test]
        fn created_sort_follows_timestamps() {
            let board_todos = vec![
                todo_n(3, "third", None),
                todo_n(1, "first", None),
                todo_n(2, "second", None),
            ];
            let mut board = board_with(board_todos, vec![]);

            assert_eq!(
                vec!["first", "second", "third"],
                texts(&board.visible_todos())
            );

            board.set_sort(SortKey::Created, SortDirection::Desc);
            assert_eq!(
                vec!["third", "second", "first"],
                texts(&board.visible_todos())
            );
        }
    }

    mod apply {
        use super::*;

        #[test]
        fn deleting_category_detaches_tasks_and_resets_filter() {
            let work = category_n(1, "Work");
            let home = category_n(2, "Home");
            let mut board = board_with(
                vec![
                    todo_n(1, "Write report", Some(work.id)),
                    todo_n(2, "Vacuum", Some(home.id)),
                    todo_n(3, "Review PR", Some(work.id)),
                ],
                vec![work.clone(), home.clone()],
            );
            board.set_filter(CategoryFilter::Category(work.id));

            board.apply(BoardEvent::CategoryDeleted(work.id));

            assert_eq!(3, board.todos().len());
            assert_eq!(None, board.todo(Uuid::from_u128(1)).and_then(|t| t.category_id));
            assert_eq!(None, board.todo(Uuid::from_u128(3)).and_then(|t| t.category_id));
            assert_eq!(
                Some(home.id),
                board.todo(Uuid::from_u128(2)).and_then(|t| t.category_id)
            );
            assert_eq!(1, board.categories().len());
            assert_eq!(CategoryFilter::All, board.view().filter);
        }

        #[test]
        fn deleting_other_category_keeps_filter() {
            let work = category_n(1, "Work");
            let home = category_n(2, "Home");
            let mut board = board_with(vec![], vec![work.clone(), home.clone()]);
            board.set_filter(CategoryFilter::Category(work.id));

            board.apply(BoardEvent::CategoryDeleted(home.id));
            assert_eq!(CategoryFilter::Category(work.id), board.view().filter);
        }

        #[test]
        fn events_for_unknown_rows_change_nothing() {
            let mut board = board_with(vec![todo_n(1, "Buy milk", None)], vec![]);
            let before = board.clone();

            board.apply(BoardEvent::TodoCompletionSet {
                id: Uuid::from_u128(99),
                completed: true,
            });
            board.apply(BoardEvent::TodoDeleted(Uuid::from_u128(99)));

            assert_eq!(before, board);
        }
    }

    #[test]
    fn counts_cover_all_tasks_regardless_of_view() {
        let work = category_n(1, "Work");
        let mut done = todo_n(2, "Vacuum", None);
        done.completed = true;
        let mut board = board_with(
            vec![
                todo_n(1, "Write report", Some(work.id)),
                done,
                todo_n(3, "Buy milk", None),
            ],
            vec![work.clone()],
        );
        board.set_search("report");

        let counts = board.counts();
        assert_eq!(3, counts.total);
        assert_eq!(2, counts.active);
        assert_eq!(1, counts.completed);
        assert_eq!(2, counts.uncategorized);
        assert_eq!(1, counts.for_category(work.id));
        assert_eq!(0, counts.for_category(Uuid::from_u128(42)));
    }

    mod resolve {
        use super::*;

        #[test]
        fn finds_unique_prefix() {
            let board = board_with(
                vec![
                    todo_n(0x1111, "a", None),
                    todo_n(0x2222, "b", None),
                ],
                vec![],
            );
            let wanted = Uuid::from_u128(0x2222);
            let full = wanted.to_string();

            assert_that!(board.resolve_todo(&full)).is_ok_containing(wanted);
            assert_that!(board.resolve_todo(&full.to_uppercase())).is_ok_containing(wanted);
        }

        #[test]
        fn reports_ambiguity_and_misses() {
            let board = board_with(
                vec![todo_n(1, "a", None), todo_n(2, "b", None)],
                vec![],
            );

            assert_that!(board.resolve_todo("0000"))
                .is_err_containing(LookupError::Ambiguous("0000".to_owned()));
            assert_that!(board.resolve_todo("ffff"))
                .is_err_containing(LookupError::NoMatch("ffff".to_owned()));
            assert_that!(board.resolve_todo("  "))
                .is_err_containing(LookupError::NoMatch("  ".to_owned()));
        }
    }

    mod load_board {
        use super::*;
        use crate::domain::board::driving_ports::BoardPort;
        use crate::domain::category::test_util::InMemoryCategoryPersistence;
        use crate::domain::profile::test_util::InMemoryProfilePersistence;
        use crate::domain::test_util::Connectivity;
        use crate::domain::todo::test_util::InMemoryTodoPersistence;
        use crate::external_connections::test_util::FakeExternalConnectivity;
        use std::sync::RwLock;

        #[tokio::test]
        async fn fetches_everything() {
            let todos = RwLock::new(InMemoryTodoPersistence::new_with_todos(&[
                todo_n(2, "second", None),
                todo_n(1, "first", None),
            ]));
            let categories = RwLock::new(InMemoryCategoryPersistence::new_with_categories(&[
                category_n(1, "Work"),
            ]));
            let profiles = InMemoryProfilePersistence::new_locked();
            let ext_cxn = FakeExternalConnectivity::signed_in();

            let load_result = BoardService
                .load_board(&ext_cxn, &todos, &categories, &profiles)
                .await;
            let board = load_result.expect("board should load");
            assert_eq!(
                vec!["first", "second"],
                texts(&board.todos().iter().collect::<Vec<_>>())
            );
            assert_eq!(1, board.categories().len());
            assert!(board.profile().is_none());
            assert_eq!(&board_user(), board.user());
        }

        #[tokio::test]
        async fn failed_fetch_leaves_that_part_empty() {
            let mut todo_persistence =
                InMemoryTodoPersistence::new_with_todos(&[todo_n(1, "first", None)]);
            todo_persistence.connected = Connectivity::Disconnected;
            let todos = RwLock::new(todo_persistence);
            let categories = RwLock::new(InMemoryCategoryPersistence::new_with_categories(&[
                category_n(1, "Work"),
            ]));
            let profiles = InMemoryProfilePersistence::new_locked();
            let ext_cxn = FakeExternalConnectivity::signed_in();

            let board = BoardService
                .load_board(&ext_cxn, &todos, &categories, &profiles)
                .await
                .expect("board should load");
            assert!(board.todos().is_empty());
            assert_eq!(1, board.categories().len());
        }

        #[tokio::test]
        async fn requires_session() {
            let todos = InMemoryTodoPersistence::new_locked();
            let categories = InMemoryCategoryPersistence::new_locked();
            let profiles = InMemoryProfilePersistence::new_locked();
            let ext_cxn = FakeExternalConnectivity::new();

            let load_result = BoardService
                .load_board(&ext_cxn, &todos, &categories, &profiles)
                .await;
            assert!(matches!(load_result, Err(BoardError::NotSignedIn(_))));
        }
    }
}
