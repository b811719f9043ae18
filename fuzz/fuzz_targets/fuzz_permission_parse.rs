#![no_main]

use gatehouse::PermissionSet;
use gatehouse_types::ParseMode;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|input: &str| {
    let strict = PermissionSet::parse(input, ParseMode::Strict);
    let lenient = PermissionSet::parse(input, ParseMode::Lenient);

    // Anything strict accepts, lenient accepts with the same meaning
    if let Ok(perms) = &strict {
        assert_eq!(lenient.as_ref().ok(), Some(perms));

        // Strict output is canonical: it round-trips through Display
        let rendered = perms.to_string();
        assert_eq!(rendered.parse::<PermissionSet>().ok(), Some(*perms));
        assert_eq!(rendered, input);
    }

    // Short input is rejected in both modes
    if input.chars().count() < 5 {
        assert!(strict.is_err());
        assert!(lenient.is_err());
    } else {
        assert!(lenient.is_ok());
    }

    if let Ok(perms) = lenient {
        assert!(perms.as_int() < 32);
    }
});
