use tracing::debug;

use crate::model::DeviceStatus;

const HEADER: &str = "List of devices attached";

/// Parse `adb devices` output into `(serial, status)` pairs, in order.
///
/// Skips blank lines, the header, and daemon notices such as
/// `* daemon started successfully`. Lines without a tab separator are
/// malformed and dropped; an empty status column becomes
/// [`DeviceStatus::Unknown`].
pub fn parse_device_list(output: &str) -> Vec<(String, DeviceStatus)> {
    output.lines().filter_map(parse_line).collect()
}

fn parse_line(line: &str) -> Option<(String, DeviceStatus)> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with(HEADER) || trimmed.starts_with("* ") {
        return None;
    }

    let Some((serial, status)) = line.split_once('\t') else {
        debug!(line = trimmed, "skipping malformed device line");
        return None;
    };

    let serial = serial.trim();
    if serial.is_empty() {
        debug!(line = trimmed, "skipping device line without a serial");
        return None;
    }

    Some((serial.to_owned(), DeviceStatus::parse(status)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn serials(output: &str) -> Vec<String> {
        parse_device_list(output).into_iter().map(|(s, _)| s).collect()
    }

    #[test]
    fn single_emulator() {
        assert_eq!(
            parse_device_list("emulator-5554\tdevice\n"),
            vec![("emulator-5554".to_string(), DeviceStatus::Online)]
        );
    }

    #[test]
    fn header_and_trailing_blank_lines_are_ignored() {
        let output = "List of devices attached\nemulator-5554\tdevice\nR58M123\tunauthorized\n\n\n";
        assert_eq!(
            parse_device_list(output),
            vec![
                ("emulator-5554".to_string(), DeviceStatus::Online),
                ("R58M123".to_string(), DeviceStatus::Unauthorized),
            ]
        );
    }

    #[test]
    fn crlf_and_trailing_whitespace_are_tolerated() {
        let output = "List of devices attached\r\n192.168.1.20:5555\toffline  \r\n   \r\n";
        assert_eq!(
            parse_device_list(output),
            vec![("192.168.1.20:5555".to_string(), DeviceStatus::Offline)]
        );
    }

    #[test]
    fn daemon_notices_are_ignored() {
        let output = "* daemon not running; starting now at tcp:5037\n\
                      * daemon started successfully\n\
                      List of devices attached\n\
                      emulator-5556\tdevice\n";
        assert_eq!(serials(output), vec!["emulator-5556"]);
    }

    #[test]
    fn preserves_input_order() {
        let output = "c\tdevice\na\toffline\nb\tdevice\n";
        assert_eq!(serials(output), vec!["c", "a", "b"]);
    }

    #[test]
    fn empty_output_yields_no_devices() {
        assert!(parse_device_list("").is_empty());
        assert!(parse_device_list("List of devices attached\n\n").is_empty());
    }

    #[test]
    fn malformed_lines_are_dropped() {
        let output = "garbage without a tab\n\tdevice\nemulator-5554\tdevice\n";
        assert_eq!(serials(output), vec!["emulator-5554"]);
    }

    #[test]
    fn missing_status_is_unknown() {
        assert_eq!(
            parse_device_list("0123456789ABCDEF\t\n"),
            vec![("0123456789ABCDEF".to_string(), DeviceStatus::Unknown)]
        );
    }

    #[test]
    fn unusual_statuses_are_kept_verbatim() {
        let output = "X1\tno permissions (missing udev rules?)\nX2\trecovery\n";
        assert_eq!(
            parse_device_list(output),
            vec![
                (
                    "X1".to_string(),
                    DeviceStatus::Other("no permissions (missing udev rules?)".into())
                ),
                ("X2".to_string(), DeviceStatus::Other("recovery".into())),
            ]
        );
    }
}
