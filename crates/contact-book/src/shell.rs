/// Line-oriented command shell over the contact list.
///
/// Every mutation builds a new contact list snapshot and commits it to the
/// history. The data file is rewritten by a history listener after each state
/// change, so the history manager itself never touches the disk.
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use contact_book_config::AppConfig;
use contact_book_mod_history::{HistoryEvent, HistoryManager, Shared};

use crate::contact::{load_contacts, names_match, save_contacts, Contact, ContactList};

const LOADED_LABEL: &str = "Loaded from disk";
const RESTORED_LABEL: &str = "Restored from backup";

const HELP: &str = "\
Commands:
  add <name>[, email[, phone]]   add a contact
  remove <name>                  remove a contact
  rename <old> => <new>          rename a contact
  list                           show all contacts
  undo | redo                    step through history
  history                        show the edit history
  clear-history                  forget undo/redo steps
  backup <file>                  save contacts to a backup file
  restore <file>                 replace contacts with a backup
  help | quit";

pub type ContactHistory = HistoryManager<Shared<ContactList>>;

/// A parsed shell command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Add {
        name: String,
        email: Option<String>,
        phone: Option<String>,
    },
    Remove(String),
    Rename {
        from: String,
        to: String,
    },
    List,
    Undo,
    Redo,
    History,
    ClearHistory,
    Backup(String),
    Restore(String),
    Help,
    Quit,
}

impl Command {
    /// Parses one input line. Blank lines and `#` comments yield `None`.
    ///
    /// # Errors
    ///
    /// Returns a user-facing message for unknown commands or missing arguments.
    pub fn parse(line: &str) -> Result<Option<Self>> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(None);
        }
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };

        let command = match word.to_ascii_lowercase().as_str() {
            "add" => {
                let mut fields = rest.split(',').map(str::trim);
                let name = fields
                    .next()
                    .filter(|name| !name.is_empty())
                    .context("usage: add <name>[, email[, phone]]")?
                    .to_string();
                let mut optional = || {
                    fields
                        .next()
                        .filter(|field| !field.is_empty())
                        .map(str::to_string)
                };
                let email = optional();
                let phone = optional();
                if optional().is_some() {
                    bail!("usage: add <name>[, email[, phone]]");
                }
                Command::Add { name, email, phone }
            }
            "remove" | "rm" => Command::Remove(required(rest, "usage: remove <name>")?),
            "rename" => {
                let (from, to) = rest
                    .split_once("=>")
                    .context("usage: rename <old> => <new>")?;
                Command::Rename {
                    from: required(from, "usage: rename <old> => <new>")?,
                    to: required(to, "usage: rename <old> => <new>")?,
                }
            }
            "list" | "ls" => Command::List,
            "undo" => Command::Undo,
            "redo" => Command::Redo,
            "history" => Command::History,
            "clear-history" => Command::ClearHistory,
            "backup" => Command::Backup(required(rest, "usage: backup <file>")?),
            "restore" => Command::Restore(required(rest, "usage: restore <file>")?),
            "help" | "?" => Command::Help,
            "quit" | "exit" => Command::Quit,
            other => bail!("Unknown command: {other} (try `help`)"),
        };
        Ok(Some(command))
    }
}

fn required(arg: &str, usage: &str) -> Result<String> {
    let arg = arg.trim();
    if arg.is_empty() {
        bail!("{usage}");
    }
    Ok(arg.to_string())
}

/// Whether the shell should keep reading commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Owns the contact history and executes commands against it.
pub struct Shell {
    history: ContactHistory,
    config: AppConfig,
}

impl Shell {
    /// Opens the shell, seeding the history from `data_file` if it exists.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing data file cannot be loaded.
    pub fn open(config: AppConfig, data_file: PathBuf) -> Result<Self> {
        let (contacts, label) = if data_file.exists() {
            let contacts = load_contacts(&data_file)?;
            tracing::info!(
                "Loaded {} contacts from {}",
                contacts.len(),
                data_file.display()
            );
            (contacts, Some(LOADED_LABEL))
        } else {
            (ContactList::new(), None)
        };

        let mut history =
            HistoryManager::with_config(Shared::new(contacts), label, config.history.clone());
        history.subscribe(move |event, entry| persist(&data_file, event, entry.value()));

        Ok(Self { history, config })
    }

    pub fn history(&self) -> &ContactHistory {
        &self.history
    }

    pub fn contacts(&self) -> &[Contact] {
        self.history.current()
    }

    /// Executes one command, writing user-facing output to `out`.
    ///
    /// # Errors
    ///
    /// Only fails if writing to `out` fails; command problems are reported
    /// as output.
    pub fn execute(&mut self, command: Command, out: &mut dyn Write) -> Result<Flow> {
        match command {
            Command::Add { name, email, phone } => self.add(name, email, phone, out)?,
            Command::Remove(name) => self.remove(&name, out)?,
            Command::Rename { from, to } => self.rename(&from, &to, out)?,
            Command::List => self.list(out)?,
            Command::Undo => {
                let undone = self.history.current_label().to_string();
                match self.history.undo() {
                    Some(_) => writeln!(out, "Undid: {undone}")?,
                    None => writeln!(out, "Nothing to undo.")?,
                }
            }
            Command::Redo => match self.history.redo() {
                Some(entry) => writeln!(out, "Redid: {}", entry.label())?,
                None => writeln!(out, "Nothing to redo.")?,
            },
            Command::History => self.show_history(out)?,
            Command::ClearHistory => {
                self.history.clear_history();
                writeln!(out, "History cleared.")?;
            }
            Command::Backup(name) => {
                let path = self.config.backup_path(&name);
                match save_contacts(&path, self.contacts()) {
                    Ok(()) => writeln!(
                        out,
                        "Backed up {} contacts to {}",
                        self.contacts().len(),
                        path.display()
                    )?,
                    Err(e) => writeln!(out, "Backup failed: {e:#}")?,
                }
            }
            Command::Restore(name) => {
                let path = self.config.backup_path(&name);
                self.restore(&path, out)?;
            }
            Command::Help => writeln!(out, "{HELP}")?,
            Command::Quit => return Ok(Flow::Quit),
        }
        Ok(Flow::Continue)
    }

    fn add(
        &mut self,
        name: String,
        email: Option<String>,
        phone: Option<String>,
        out: &mut dyn Write,
    ) -> Result<()> {
        if self.contacts().iter().any(|c| c.is_named(&name)) {
            writeln!(out, "A contact named {name} already exists.")?;
            return Ok(());
        }
        let label = format!("Added {name}");
        let contact = Contact::new(name, email, phone);
        self.history.set_with(
            |list| {
                let mut next = ContactList::clone(list);
                next.push(contact);
                Shared::new(next)
            },
            Some(label.as_str()),
        );
        writeln!(out, "{label}")?;
        Ok(())
    }

    /// Stored spelling of the contact matching `name`.
    fn stored_name(&self, name: &str) -> Option<String> {
        self.contacts()
            .iter()
            .find(|c| c.is_named(name))
            .map(|c| c.name.clone())
    }

    fn remove(&mut self, name: &str, out: &mut dyn Write) -> Result<()> {
        let Some(stored) = self.stored_name(name) else {
            writeln!(out, "No contact named {name}.")?;
            return Ok(());
        };
        let label = format!("Removed {stored}");
        self.history.set_with(
            |list| Shared::new(list.iter().filter(|c| c.name != stored).cloned().collect()),
            Some(label.as_str()),
        );
        writeln!(out, "{label}")?;
        Ok(())
    }

    fn rename(&mut self, from: &str, to: &str, out: &mut dyn Write) -> Result<()> {
        let Some(stored) = self.stored_name(from) else {
            writeln!(out, "No contact named {from}.")?;
            return Ok(());
        };
        if stored == to {
            writeln!(out, "{stored} is already named {to}.")?;
            return Ok(());
        }
        if !names_match(&stored, to) && self.stored_name(to).is_some() {
            writeln!(out, "A contact named {to} already exists.")?;
            return Ok(());
        }
        let label = format!("Renamed {stored} to {to}");
        self.history.set_with(
            |list| {
                let mut next = ContactList::clone(list);
                if let Some(contact) = next.iter_mut().find(|c| c.name == stored) {
                    contact.name = to.to_string();
                }
                Shared::new(next)
            },
            Some(label.as_str()),
        );
        writeln!(out, "{label}")?;
        Ok(())
    }

    fn list(&self, out: &mut dyn Write) -> Result<()> {
        if self.contacts().is_empty() {
            writeln!(out, "No contacts.")?;
        }
        for (i, contact) in self.contacts().iter().enumerate() {
            writeln!(out, "{:>3}. {contact}", i + 1)?;
        }
        Ok(())
    }

    fn show_history(&self, out: &mut dyn Write) -> Result<()> {
        let present = self.history.undo_depth();
        for (i, entry) in self.history.history().enumerate() {
            let marker = if i == present { '>' } else { ' ' };
            writeln!(out, "{marker} {:>3}  {}", i + 1, entry.label())?;
        }
        if let Some(next) = self.history.redo_label() {
            writeln!(
                out,
                "      ({} redo step(s) available, next: {next})",
                self.history.redo_depth()
            )?;
        }
        Ok(())
    }

    fn restore(&mut self, path: &Path, out: &mut dyn Write) -> Result<()> {
        match load_contacts(path) {
            Ok(contacts) => {
                let count = contacts.len();
                self.history.set_initial(Shared::new(contacts), Some(RESTORED_LABEL));
                tracing::info!("Restored {count} contacts from {}", path.display());
                writeln!(out, "Restored {count} contacts from {}", path.display())?;
            }
            Err(e) => writeln!(out, "Restore failed: {e:#}")?,
        }
        Ok(())
    }
}

/// Saves the present contact list after a state change.
///
/// Failures are logged and otherwise ignored.
fn persist(path: &Path, event: HistoryEvent, contacts: &[Contact]) {
    if event == HistoryEvent::Cleared {
        return;
    }
    match save_contacts(path, contacts) {
        Ok(()) => tracing::debug!("Saved {} contacts after {event:?}", contacts.len()),
        Err(e) => tracing::warn!("Failed to save contacts after {event:?}: {e:#}"),
    }
}

/// Reads commands from `input` until it ends or `quit` is entered.
///
/// # Errors
///
/// Returns an error if reading input or writing output fails.
pub fn run(shell: &mut Shell, input: impl BufRead, out: &mut dyn Write, prompt: bool) -> Result<()> {
    if prompt {
        show_prompt(out)?;
    }
    for line in input.lines() {
        let line = line.context("Failed to read command")?;
        match Command::parse(&line) {
            Ok(Some(command)) => {
                if shell.execute(command, out)? == Flow::Quit {
                    return Ok(());
                }
            }
            Ok(None) => {}
            Err(e) => writeln!(out, "{e}")?,
        }
        if prompt {
            show_prompt(out)?;
        }
    }
    Ok(())
}

fn show_prompt(out: &mut dyn Write) -> Result<()> {
    write!(out, "> ")?;
    out.flush()?;
    Ok(())
}
