// ── Line formatting for snapshots and changes ──

use std::fmt::Write as _;

use chrono::{DateTime, Local};

use vantage_core::{ObjectEvent, SystemObject};

/// `  10 Temperature  Kitchen  value=21.500`
pub fn object_line(object: &SystemObject) -> String {
    let mut line = format!(
        "{:>6} {:<24} {}",
        object.id,
        object.object_type,
        object.display_name()
    );
    for (name, value) in object.attributes() {
        let _ = write!(line, "  {name}={value}");
    }
    line
}

pub fn event_line(event: &ObjectEvent, at: DateTime<Local>) -> String {
    let object = event.object();
    let stamp = at.format("%H:%M:%S%.3f");
    match event {
        ObjectEvent::Added(_) => format!("{stamp} + {}", object_line(object)),
        ObjectEvent::Removed(_) => format!("{stamp} - {:>6} {}", object.id, object.display_name()),
        ObjectEvent::Updated { changes, .. } => {
            let mut line = format!("{stamp} ~ {:>6} {}", object.id, object.display_name());
            for (name, value) in changes.iter() {
                let _ = write!(line, "  {name}={value}");
            }
            line
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use vantage_core::ObjectInfo;

    #[test]
    fn removed_objects_show_id_and_name() {
        let object = Arc::new(SystemObject::from_info(
            ObjectInfo::new(7, "Load").with_name("Porch"),
        ));
        let at = Local::now();
        let line = event_line(&ObjectEvent::Removed(object), at);
        assert!(line.ends_with("-      7 Porch"), "{line}");
    }
}
