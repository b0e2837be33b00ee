/// Which screen currently owns the terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AppView {
    Dashboard,
    Detail,
    Deploy,
    Logs,
    Traffic,
}
