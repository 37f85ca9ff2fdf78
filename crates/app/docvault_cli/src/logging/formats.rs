use flexi_logger::DeferredNow;
use flexi_logger::style;
use log::{Level, Record};

/// Plain messages for info, a colored level tag for everything else.
pub fn cli_format(
    w: &mut dyn std::io::Write,
    _now: &mut DeferredNow,
    record: &Record,
) -> Result<(), std::io::Error> {
    let level = record.level();
    if level == Level::Info {
        write!(w, "{}", record.args())
    } else {
        write!(
            w,
            "{} {}",
            style(level).paint(level.to_string().to_lowercase()),
            record.args()
        )
    }
}
