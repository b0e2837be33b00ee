//! Row and viewport model for the dashboard.
//!
//! Services are grouped into header/service rows; the cursor only ever rests
//! on a service row and the scroll offset is measured in visual lines.

use std::collections::BTreeMap;

use crate::config::{CATEGORY_ORDER, UNCATEGORIZED, WEB_SERVICES};
use crate::model::{Service, ServiceGroup};
use crate::naming::service_key;

#[derive(Clone, Debug, PartialEq)]
pub enum DashboardRow {
    Header(String),
    Service(Service),
}

impl DashboardRow {
    pub fn is_header(&self) -> bool {
        matches!(self, DashboardRow::Header(_))
    }

    pub fn service(&self) -> Option<&Service> {
        match self {
            DashboardRow::Service(s) => Some(s),
            DashboardRow::Header(_) => None,
        }
    }
}

fn web_rank(service: &Service) -> usize {
    let key = service_key(&service.name);
    WEB_SERVICES
        .iter()
        .position(|w| w.name == key)
        .unwrap_or(WEB_SERVICES.len())
}

fn push_group(rows: &mut Vec<DashboardRow>, label: String, services: Vec<Service>) {
    if services.is_empty() {
        return;
    }
    rows.push(DashboardRow::Header(label));
    rows.extend(services.into_iter().map(DashboardRow::Service));
}

/// Group services into header and service rows.
///
/// Order: Web (rollout order), worker categories (known order first, then the
/// rest alphabetically), Proxy, Other. Workers and Other sort by name.
pub fn build_rows(services: &[Service]) -> Vec<DashboardRow> {
    let mut web = Vec::new();
    let mut workers: BTreeMap<String, Vec<Service>> = BTreeMap::new();
    let mut proxy = Vec::new();
    let mut other = Vec::new();

    for svc in services {
        match svc.group {
            ServiceGroup::Web => web.push(svc.clone()),
            ServiceGroup::Worker => {
                let cat = if svc.category.is_empty() { UNCATEGORIZED } else { svc.category.as_str() };
                workers.entry(cat.to_string()).or_default().push(svc.clone());
            }
            ServiceGroup::Proxy => proxy.push(svc.clone()),
            ServiceGroup::Other => other.push(svc.clone()),
        }
    }

    let mut rows = Vec::new();
    web.sort_by(|a, b| web_rank(a).cmp(&web_rank(b)).then_with(|| a.name.cmp(&b.name)));
    push_group(&mut rows, ServiceGroup::Web.label().to_string(), web);

    for cat in CATEGORY_ORDER {
        if let Some(mut svcs) = workers.remove(cat) {
            svcs.sort_by(|a, b| a.name.cmp(&b.name));
            push_group(&mut rows, format!("Workers - {}", cat), svcs);
        }
    }
    for (cat, mut svcs) in workers {
        svcs.sort_by(|a, b| a.name.cmp(&b.name));
        push_group(&mut rows, format!("Workers - {}", cat), svcs);
    }

    push_group(&mut rows, ServiceGroup::Proxy.label().to_string(), proxy);
    other.sort_by(|a, b| a.name.cmp(&b.name));
    push_group(&mut rows, ServiceGroup::Other.label().to_string(), other);
    rows
}

/// Case-insensitive substring filter over service names.
pub fn filter_services(services: &[Service], filter: &str) -> Vec<Service> {
    if filter.is_empty() {
        return services.to_vec();
    }
    let needle = filter.to_lowercase();
    services
        .iter()
        .filter(|s| s.name.to_lowercase().contains(&needle))
        .cloned()
        .collect()
}

/// Visual height of a row: headers after the first carry a blank separator.
pub fn row_height(rows: &[DashboardRow], index: usize) -> usize {
    if index > 0 && rows.get(index).is_some_and(|r| r.is_header()) { 2 } else { 1 }
}

/// Visual line on which row `index` starts.
pub fn visual_line(rows: &[DashboardRow], index: usize) -> usize {
    (0..index.min(rows.len())).map(|i| row_height(rows, i)).sum()
}

pub fn total_visual_lines(rows: &[DashboardRow]) -> usize {
    visual_line(rows, rows.len())
}

/// Move one row in `direction` (+1/-1), skipping headers. Stays put if no
/// service row exists that way.
pub fn cursor_move(rows: &[DashboardRow], cursor: usize, direction: isize) -> usize {
    let mut pos = cursor as isize + direction;
    while pos >= 0 && (pos as usize) < rows.len() {
        if !rows[pos as usize].is_header() {
            return pos as usize;
        }
        pos += direction;
    }
    cursor
}

/// First service row, or 0 when there is none.
pub fn first_service_row(rows: &[DashboardRow]) -> usize {
    rows.iter().position(|r| !r.is_header()).unwrap_or(0)
}

/// Smallest scroll adjustment that keeps the cursor's line in view.
pub fn ensure_visible(rows: &[DashboardRow], cursor: usize, scroll: usize, viewport: usize) -> usize {
    if rows.is_empty() {
        return 0;
    }
    let viewport = viewport.max(1);
    let line = visual_line(rows, cursor);
    if line < scroll {
        line
    } else if line >= scroll + viewport {
        line + 1 - viewport
    } else {
        scroll
    }
}

/// The dashboard's service list with its derived rows, cursor and scroll.
#[derive(Clone, Debug, Default)]
pub struct ServiceList {
    pub services: Vec<Service>,
    pub filter: String,
    pub rows: Vec<DashboardRow>,
    pub cursor: usize,
    pub scroll: usize,
}

impl ServiceList {
    pub fn new(services: Vec<Service>) -> Self {
        let mut list = Self { services, ..Default::default() };
        list.apply_filter();
        list
    }

    pub fn selected(&self) -> Option<&Service> {
        self.rows.get(self.cursor).and_then(|r| r.service())
    }

    /// Number of services visible under the current filter.
    pub fn visible_count(&self) -> usize {
        self.rows.iter().filter(|r| !r.is_header()).count()
    }

    /// Rebuild rows from the filter and reset cursor and scroll.
    pub fn apply_filter(&mut self) {
        self.rows = build_rows(&filter_services(&self.services, &self.filter));
        self.cursor = first_service_row(&self.rows);
        self.scroll = 0;
    }

    pub fn set_filter(&mut self, filter: &str) {
        self.filter = filter.to_string();
        self.apply_filter();
    }

    /// Replace the services, keeping the cursor on the same service by name.
    pub fn replace_services(&mut self, services: Vec<Service>, viewport: usize) {
        let selected = self.selected().map(|s| s.name.clone());
        self.services = services;
        self.rows = build_rows(&filter_services(&self.services, &self.filter));
        let restored = selected.and_then(|name| {
            self.rows
                .iter()
                .position(|r| r.service().is_some_and(|s| s.name == name))
        });
        self.cursor = restored.unwrap_or_else(|| first_service_row(&self.rows));
        self.scroll = ensure_visible(&self.rows, self.cursor, self.scroll, viewport);
    }

    pub fn move_cursor(&mut self, direction: isize, viewport: usize) {
        self.cursor = cursor_move(&self.rows, self.cursor, direction);
        self.scroll = ensure_visible(&self.rows, self.cursor, self.scroll, viewport);
    }

    /// Move by up to `viewport` service rows.
    pub fn page(&mut self, direction: isize, viewport: usize) {
        for _ in 0..viewport.max(1) {
            let next = cursor_move(&self.rows, self.cursor, direction);
            if next == self.cursor {
                break;
            }
            self.cursor = next;
        }
        self.scroll = ensure_visible(&self.rows, self.cursor, self.scroll, viewport);
    }

    pub fn find(&self, name: &str) -> Option<&Service> {
        self.services.iter().find(|s| s.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WorkerCatalog;
    use crate::naming::classified;

    fn services(names: &[&str]) -> Vec<Service> {
        let (catalog, _) = crate::config::parse_workers(
            r#"{"workers":{"birthday-notify":{"category":"email"},"esn-fired":{"category":"esn"},"odd":{"category":"zz-custom"}}}"#,
        )
        .unwrap();
        names.iter().map(|n| classified(n, &catalog)).collect()
    }

    fn labels(rows: &[DashboardRow]) -> Vec<String> {
        rows.iter()
            .map(|r| match r {
                DashboardRow::Header(h) => format!("# {}", h),
                DashboardRow::Service(s) => s.name.clone(),
            })
            .collect()
    }

    #[test]
    fn build_rows_orders_groups() {
        let rows = build_rows(&services(&[
            "zebra-service",
            "web-stable-service",
            "worker-odd-service",
            "proxy-service",
            "worker-esn-fired-service",
            "web-canary-service",
            "worker-birthday-notify-service",
            "worker-unlisted-service",
        ]));
        assert_eq!(
            labels(&rows),
            vec![
                "# Web",
                "web-canary-service",
                "web-stable-service",
                "# Workers - email",
                "worker-birthday-notify-service",
                "# Workers - esn",
                "worker-esn-fired-service",
                "# Workers - uncategorized",
                "worker-unlisted-service",
                "# Workers - zz-custom",
                "worker-odd-service",
                "# Proxy",
                "proxy-service",
                "# Other",
                "zebra-service",
            ]
        );
    }

    #[test]
    fn empty_list_yields_no_rows() {
        let rows = build_rows(&[]);
        assert!(rows.is_empty());
        assert_eq!(cursor_move(&rows, 0, 1), 0);
        assert_eq!(ensure_visible(&rows, 0, 3, 5), 0);
    }

    #[test]
    fn cursor_never_lands_on_header() {
        let rows = build_rows(&services(&[
            "web-canary-service",
            "worker-birthday-notify-service",
            "proxy-service",
            "other-service",
        ]));
        for start in 0..rows.len() {
            for dir in [-1, 1] {
                let next = cursor_move(&rows, start, dir);
                assert!(next < rows.len());
                if next != start {
                    assert!(!rows[next].is_header());
                }
            }
        }
        // From the first service, moving up has nowhere to go.
        assert_eq!(cursor_move(&rows, 1, -1), 1);
        // Down from the last web row skips the workers header.
        assert_eq!(cursor_move(&rows, 1, 1), 3);
    }

    #[test]
    fn ensure_visible_keeps_cursor_in_viewport() {
        let names: Vec<String> = (0..12).map(|i| format!("worker-w{:02}-service", i)).collect();
        let refs: Vec<&str> = names.iter().map(|s| s.as_str()).collect();
        let mut all = services(&refs);
        all.extend(services(&["web-canary-service", "proxy-service", "x-service"]));
        let rows = build_rows(&all);
        for viewport in 1..8 {
            for cursor in 0..rows.len() {
                for scroll in [0, 3, 30] {
                    let s = ensure_visible(&rows, cursor, scroll, viewport);
                    let line = visual_line(&rows, cursor);
                    assert!(s <= line && line < s + viewport, "vp={} cur={} scroll={}", viewport, cursor, scroll);
                }
            }
        }
    }

    #[test]
    fn headers_after_first_take_two_lines() {
        let rows = build_rows(&services(&["web-canary-service", "proxy-service"]));
        // # Web, web-canary, (blank) # Proxy, proxy
        assert_eq!(visual_line(&rows, 3), 4);
        assert_eq!(total_visual_lines(&rows), 5);
    }

    #[test]
    fn filter_resets_cursor_to_first_service() {
        let mut list = ServiceList::new(services(&["web-canary-service", "web-stable-service", "proxy-service"]));
        list.move_cursor(1, 10);
        assert_eq!(list.selected().map(|s| s.name.as_str()), Some("web-stable-service"));
        list.set_filter("PROXY");
        assert_eq!(list.selected().map(|s| s.name.as_str()), Some("proxy-service"));
        assert_eq!(list.visible_count(), 1);
        assert_eq!(list.scroll, 0);
    }

    #[test]
    fn replace_preserves_cursor_by_name() {
        let mut list = ServiceList::new(services(&["web-canary-service", "web-stable-service", "proxy-service"]));
        list.move_cursor(1, 10);
        list.replace_services(services(&["web-shop-service", "web-stable-service", "web-canary-service"]), 10);
        assert_eq!(list.selected().map(|s| s.name.as_str()), Some("web-stable-service"));

        list.replace_services(services(&["proxy-service", "web-canary-service"]), 10);
        assert_eq!(list.selected().map(|s| s.name.as_str()), Some("web-canary-service"));
    }

    #[test]
    fn page_moves_by_viewport() {
        let names: Vec<String> = (0..10).map(|i| format!("svc{}-service", i)).collect();
        let refs: Vec<&str> = names.iter().map(|s| s.as_str()).collect();
        let mut list = ServiceList::new(services(&refs));
        list.page(1, 4);
        assert_eq!(list.cursor, 5);
        list.page(1, 100);
        assert_eq!(list.cursor, 10);
        list.page(-1, 100);
        assert_eq!(list.cursor, 1);
    }

    #[test]
    fn empty_catalog_is_fine() {
        let list = ServiceList::new(vec![classified("worker-x-service", &WorkerCatalog::default())]);
        assert_eq!(list.rows.len(), 2);
        assert_eq!(list.cursor, 1);
    }
}
