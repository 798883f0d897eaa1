/// ASCII emoticons in priority order: earlier entries are replaced first.
///
/// `:-)` precedes `:)` so the nose variant is consumed whole.
pub(crate) const BASIC_EMOTICONS: &[(&str, &str)] = &[
    (":-)", "happy"),
    (":)", "happy"),
    (":D", "happy"),
    (":O", "surprised"),
    (":-(", "sad"),
    (":(", "sad"),
];
