use iced::font;
use iced::widget::{
    button, checkbox, column, container, pick_list, row, scrollable, text, text_input, Column,
};
use iced::{Alignment, Color, Element, Font, Length, Task, Theme};
use rfd::FileDialog;
use std::path::PathBuf;

mod io;
mod sorter;
mod state;

use sorter::criteria::{Criterion, ALL_CRITERIA};
use sorter::letters::{self, LetterPolicy, ALL_POLICIES};
use sorter::planner;
use sorter::populate::{
    ChunkOutcome, PopulateOptions, SortDirection, SortKey, TreePopulator, DEFAULT_CHUNK_SIZE,
};
use state::collection::Collection;
use state::data::{Card, CardId, SortGroup};

/// What the view needs from a materialized group besides its counts
#[derive(Debug, Clone)]
struct TreeRow {
    cards: Vec<CardId>,
    has_children: bool,
}

/// Main application state
struct CardSorter {
    /// The canonical card store
    collection: Collection,
    /// The full grouping hierarchy for the active criteria
    plan: Vec<SortGroup>,
    /// Active criteria, in partition order
    criteria: Vec<Criterion>,
    /// Breadcrumb path of group names into the plan
    path: Vec<String>,
    /// Letter-pile view over the cards at the current path
    letter_view: bool,
    /// An opened letter pile: its label and member cards
    pile: Option<(String, Vec<CardId>)>,
    show_sorted: bool,
    policy: LetterPolicy,
    threshold_input: String,
    /// Chunked row materialization driven by PopulateTick messages
    populator: TreePopulator<TreeRow>,
    /// Status message to display to the user
    status: String,
}

/// Application messages (events)
#[derive(Debug, Clone)]
enum Message {
    /// User clicked the "Import CSV" button
    ImportRequested,
    /// Background CSV parse completed
    ImportLoaded(Result<Vec<Card>, String>),
    /// One populate scheduling tick; loops until the run finishes
    PopulateTick,
    CriterionAdded(Criterion),
    CriterionRemoved(usize),
    ShowSortedToggled(bool),
    LetterViewToggled(bool),
    PolicyChanged(LetterPolicy),
    ThresholdChanged(String),
    /// User clicked a group row to drill into it
    RowActivated(usize),
    /// User checked or unchecked a row, marking its cards sorted;
    /// carries the group name so a stale index cannot hit another row
    RowToggled(usize, String, bool),
    /// User clicked a breadcrumb; 0 is the root
    BreadcrumbClicked(usize),
    SaveProject,
    LoadProject,
    ExportView,
    ExportPileReport,
    ClearCollection,
}

impl CardSorter {
    fn new() -> (Self, Task<Message>) {
        (
            CardSorter {
                collection: Collection::new(),
                plan: Vec::new(),
                criteria: vec![Criterion::Set],
                path: Vec::new(),
                letter_view: false,
                pile: None,
                show_sorted: true,
                policy: LetterPolicy::AdjacentRuns,
                threshold_input: "20".to_string(),
                populator: TreePopulator::new(),
                status: "Import a collection CSV to begin.".to_string(),
            },
            Task::none(),
        )
    }

    /// Handle application messages and update state
    fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::ImportRequested => {
                let file = FileDialog::new()
                    .set_title("Select Collection CSV")
                    .add_filter("CSV files", &["csv"])
                    .pick_file();

                if let Some(path) = file {
                    self.status = format!("Importing {}...", path.display());
                    return Task::perform(import_csv_async(path), Message::ImportLoaded);
                }
                Task::none()
            }
            Message::ImportLoaded(Ok(cards)) => {
                self.collection = Collection::from_cards(cards);
                log::info!(
                    "imported {} unique cards, {} copies",
                    self.collection.unique_count(),
                    self.collection.total_quantity()
                );
                self.status = format!(
                    "Imported {} unique cards ({} copies).",
                    self.collection.unique_count(),
                    self.collection.total_quantity()
                );
                self.path.clear();
                self.pile = None;
                self.regenerate()
            }
            Message::ImportLoaded(Err(error)) => {
                log::warn!("import failed: {error}");
                self.status = format!("Import failed: {error}");
                Task::none()
            }
            Message::PopulateTick => match self.populator.process_chunk() {
                ChunkOutcome::Progress { .. } => Task::done(Message::PopulateTick),
                ChunkOutcome::Finished { total } => {
                    self.status = format!("{total} groups displayed.");
                    Task::none()
                }
                ChunkOutcome::Idle => Task::none(),
            },
            Message::CriterionAdded(criterion) => {
                if self.criteria.contains(&criterion) {
                    return Task::none();
                }
                self.criteria.push(criterion);
                self.path.clear();
                self.pile = None;
                self.regenerate()
            }
            Message::CriterionRemoved(index) => {
                if index < self.criteria.len() {
                    self.criteria.remove(index);
                    self.path.clear();
                    self.pile = None;
                    return self.regenerate();
                }
                Task::none()
            }
            Message::ShowSortedToggled(value) => {
                self.show_sorted = value;
                self.regenerate()
            }
            Message::LetterViewToggled(value) => {
                self.letter_view = value;
                self.pile = None;
                self.regenerate()
            }
            Message::PolicyChanged(policy) => {
                self.policy = policy;
                if self.letter_view {
                    return self.regenerate();
                }
                Task::none()
            }
            Message::ThresholdChanged(value) => {
                self.threshold_input = value;
                if self.letter_view {
                    return self.regenerate();
                }
                Task::none()
            }
            Message::RowActivated(index) => {
                let Some(item) = self.populator.items().get(index) else {
                    return Task::none();
                };
                if self.letter_view {
                    if self.pile.is_none() {
                        self.pile = Some((item.group_name.clone(), item.element.cards.clone()));
                        return self.regenerate();
                    }
                } else if item.element.has_children {
                    self.path.push(item.group_name.clone());
                    return self.regenerate();
                }
                Task::none()
            }
            Message::RowToggled(index, group, sorted) => {
                let Some(item) = self.populator.items().get(index) else {
                    return Task::none();
                };
                // A regenerate may have replaced the rows between render
                // and handling; act only if the row still names the same
                // group.
                if item.group_name != group {
                    return Task::none();
                }
                let cards = item.element.cards.clone();
                self.collection.mark_sorted(&cards, sorted);
                self.regenerate()
            }
            Message::BreadcrumbClicked(depth) => {
                self.path.truncate(depth);
                self.pile = None;
                self.regenerate()
            }
            Message::SaveProject => {
                if self.collection.is_empty() {
                    self.status = "Nothing to save.".to_string();
                    return Task::none();
                }
                let file = FileDialog::new()
                    .set_title("Save Project")
                    .add_filter("Sorter projects", &[io::project::PROJECT_EXTENSION])
                    .save_file();
                if let Some(path) = file {
                    let data = io::project::ProjectData::new(&self.collection, self.settings());
                    self.status = match io::project::save(&path, &data) {
                        Ok(()) => format!("Project saved to {}.", path.display()),
                        Err(error) => {
                            log::warn!("project save failed: {error}");
                            format!("Save failed: {error}")
                        }
                    };
                }
                Task::none()
            }
            Message::LoadProject => {
                let file = FileDialog::new()
                    .set_title("Open Project")
                    .add_filter("Sorter projects", &[io::project::PROJECT_EXTENSION])
                    .pick_file();
                let Some(path) = file else {
                    return Task::none();
                };
                match io::project::load(&path) {
                    Ok(data) => {
                        let (collection, settings) = data.into_collection();
                        self.collection = collection;
                        self.apply_settings(&settings);
                        self.path.clear();
                        self.pile = None;
                        self.status = format!(
                            "Project loaded: {} unique cards, {} unsorted copies.",
                            self.collection.unique_count(),
                            self.collection.total_unsorted()
                        );
                        self.regenerate()
                    }
                    Err(error) => {
                        log::warn!("project load failed: {error}");
                        self.status = format!("Load failed: {error}");
                        Task::none()
                    }
                }
            }
            Message::ExportView => {
                if self.populator.items().is_empty() {
                    self.status = "Nothing to export.".to_string();
                    return Task::none();
                }
                let file = FileDialog::new()
                    .set_title("Export View")
                    .add_filter("CSV files", &["csv"])
                    .save_file();
                if let Some(path) = file {
                    self.status = match io::export::write_view_csv(&path, self.populator.items())
                    {
                        Ok(()) => format!("View exported to {}.", path.display()),
                        Err(error) => format!("Export failed: {error}"),
                    };
                }
                Task::none()
            }
            Message::ExportPileReport => {
                if self.collection.is_empty() {
                    self.status = "Nothing to export.".to_string();
                    return Task::none();
                }
                let file = FileDialog::new()
                    .set_title("Export Pile Report")
                    .add_filter("CSV files", &["csv"])
                    .save_file();
                if let Some(path) = file {
                    let ids = self.scope_ids();
                    let counts = letters::letter_counts(&self.collection, &ids);
                    let mapping = letters::build_mapping(&counts, self.threshold(), self.policy);
                    self.status = match io::export::write_pile_report(&path, &counts, &mapping) {
                        Ok(()) => format!("Pile report exported to {}.", path.display()),
                        Err(error) => format!("Export failed: {error}"),
                    };
                }
                Task::none()
            }
            Message::ClearCollection => {
                self.collection.clear();
                self.plan.clear();
                self.path.clear();
                self.pile = None;
                self.populator.cancel();
                self.status = "Collection cleared.".to_string();
                Task::none()
            }
        }
    }

    /// Rebuild the plan for the current criteria, pick the nodes at the
    /// current path, and kick off a progressive populate over them.
    fn regenerate(&mut self) -> Task<Message> {
        match planner::generate(&self.collection, &self.collection.ids(), &self.criteria) {
            Ok(plan) => self.plan = plan,
            Err(error) => {
                self.status = format!("Cannot build plan: {error}");
                return Task::none();
            }
        }

        let (nodes, sort_key) = if let Some((_, members)) = self.pile.clone() {
            // Inside a pile the sorter reads an alphabetical checklist
            let nodes = planner::generate(&self.collection, &members, &[Criterion::Name])
                .unwrap_or_default();
            (nodes, SortKey::Name)
        } else if self.letter_view {
            let ids = self.scope_ids();
            let (nodes, _mapping) =
                letters::letter_plan(&self.collection, &ids, self.policy, self.threshold());
            (nodes, SortKey::Name)
        } else {
            let nodes = planner::groups_at_path(&self.plan, &self.path).to_vec();
            let key = if self.criteria == [Criterion::Name] {
                SortKey::Name
            } else {
                SortKey::UnsortedCount
            };
            (nodes, key)
        };

        let direction = match sort_key {
            SortKey::Name => SortDirection::Ascending,
            _ => SortDirection::Descending,
        };
        self.populator.start(
            nodes,
            PopulateOptions {
                chunk_size: DEFAULT_CHUNK_SIZE,
                show_sorted: self.show_sorted,
                sort_key,
                direction,
            },
            |node, _| TreeRow {
                cards: node.cards.clone(),
                has_children: !node.children.is_empty(),
            },
            || log::debug!("populate run finished"),
        );
        Task::done(Message::PopulateTick)
    }

    /// Cards under the current breadcrumb path
    fn scope_ids(&self) -> Vec<CardId> {
        if self.path.is_empty() {
            self.collection.ids()
        } else {
            planner::get_cards_at_path(&self.plan, &self.path)
        }
    }

    fn threshold(&self) -> u32 {
        self.threshold_input.trim().parse().unwrap_or(20)
    }

    fn settings(&self) -> io::project::ProjectSettings {
        io::project::ProjectSettings {
            sort_criteria: self.criteria.iter().map(|c| c.name().to_string()).collect(),
            letter_policy: self.policy.tag().to_string(),
            group_threshold: self.threshold(),
            show_sorted: self.show_sorted,
        }
    }

    fn apply_settings(&mut self, settings: &io::project::ProjectSettings) {
        self.criteria = settings
            .sort_criteria
            .iter()
            .filter_map(|name| match Criterion::from_name(name) {
                Ok(criterion) => Some(criterion),
                Err(error) => {
                    log::warn!("skipping saved criterion: {error}");
                    None
                }
            })
            .collect();
        self.policy = LetterPolicy::from_tag(&settings.letter_policy);
        self.threshold_input = settings.group_threshold.to_string();
        self.show_sorted = settings.show_sorted;
    }

    /// Build the user interface
    fn view(&self) -> Element<Message> {
        let toolbar = row![
            button("Import CSV").on_press(Message::ImportRequested).padding(8),
            button("Open Project").on_press(Message::LoadProject).padding(8),
            button("Save Project").on_press(Message::SaveProject).padding(8),
            button("Export View").on_press(Message::ExportView).padding(8),
            button("Pile Report").on_press(Message::ExportPileReport).padding(8),
            button("Clear").on_press(Message::ClearCollection).padding(8),
        ]
        .spacing(10);

        let mut criteria_bar = row![text("Sort by:").size(16)]
            .spacing(8)
            .align_y(Alignment::Center);
        for (i, criterion) in self.criteria.iter().enumerate() {
            criteria_bar = criteria_bar.push(
                button(text(format!("{criterion} ✕")).size(14))
                    .on_press(Message::CriterionRemoved(i))
                    .padding(6),
            );
        }
        let available: Vec<Criterion> = ALL_CRITERIA
            .iter()
            .copied()
            .filter(|c| !self.criteria.contains(c))
            .collect();
        criteria_bar = criteria_bar.push(
            pick_list(available, None::<Criterion>, Message::CriterionAdded)
                .placeholder("Add criterion..."),
        );

        let options_bar = row![
            checkbox("Show sorted cards", self.show_sorted)
                .on_toggle(Message::ShowSortedToggled),
            checkbox("Letter piles", self.letter_view).on_toggle(Message::LetterViewToggled),
            pick_list(ALL_POLICIES, Some(self.policy), Message::PolicyChanged),
            text("Min pile size:").size(14),
            text_input("20", &self.threshold_input)
                .on_input(Message::ThresholdChanged)
                .width(60),
        ]
        .spacing(12)
        .align_y(Alignment::Center);

        let mut breadcrumbs = row![button(text("All").size(14))
            .style(button::text)
            .on_press(Message::BreadcrumbClicked(0))]
        .spacing(4)
        .align_y(Alignment::Center);
        for (i, segment) in self.path.iter().enumerate() {
            breadcrumbs = breadcrumbs.push(text("›").size(14));
            breadcrumbs = breadcrumbs.push(
                button(text(segment.as_str()).size(14))
                    .style(button::text)
                    .on_press(Message::BreadcrumbClicked(i + 1)),
            );
        }
        if let Some((pile_name, _)) = &self.pile {
            breadcrumbs = breadcrumbs.push(text("›").size(14));
            breadcrumbs = breadcrumbs.push(text(format!("Pile {pile_name}")).size(14));
        }

        let mut list = Column::new().spacing(2);
        for (i, item) in self.populator.items().iter().enumerate() {
            if item.state.hidden {
                continue;
            }

            let muted = item.state.checked || item.state.struck;
            let color = if muted {
                Some(Color::from_rgb(0.55, 0.55, 0.55))
            } else {
                None
            };
            let label_text = if item.state.leaf {
                format!("{}  ({} copies)", item.group_name, item.total_count)
            } else {
                format!(
                    "{}  ({} cards, {} unsorted)",
                    item.group_name, item.total_count, item.unsorted_count
                )
            };
            let mut label = text(label_text)
                .size(16)
                .style(move |_theme| text::Style { color });
            if item.state.leaf {
                label = label.font(Font {
                    style: font::Style::Italic,
                    ..Font::DEFAULT
                });
            }

            let activatable = item.element.has_children
                || (self.letter_view && self.pile.is_none() && !item.element.cards.is_empty());
            let name_button = button(label)
                .style(button::text)
                .on_press_maybe(activatable.then_some(Message::RowActivated(i)));

            let group_name = item.group_name.clone();
            list = list.push(
                row![
                    checkbox("", item.state.checked).on_toggle(move |value| {
                        Message::RowToggled(i, group_name.clone(), value)
                    }),
                    name_button,
                ]
                .spacing(6)
                .align_y(Alignment::Center),
            );
        }

        let content = column![
            toolbar,
            criteria_bar,
            options_bar,
            breadcrumbs,
            scrollable(list).height(Length::Fill).width(Length::Fill),
            text(&self.status).size(14),
        ]
        .spacing(12)
        .padding(16);

        container(content)
            .width(Length::Fill)
            .height(Length::Fill)
            .into()
    }

    /// Set the application theme
    fn theme(&self) -> Theme {
        Theme::Dark
    }
}

fn main() -> iced::Result {
    env_logger::init();
    iced::application("Card Sorter", CardSorter::update, CardSorter::view)
        .theme(CardSorter::theme)
        .centered()
        .run_with(CardSorter::new)
}

/// Parse a collection CSV off the UI thread.
/// The error is flattened to a string so the message stays Clone.
async fn import_csv_async(path: PathBuf) -> Result<Vec<Card>, String> {
    tokio::task::spawn_blocking(move || {
        io::csv::read_collection_csv(&path).map_err(|e| e.to_string())
    })
    .await
    .map_err(|e| e.to_string())?
}
