use std::any::Any;

/// Текст паники из её полезной нагрузки.
///
/// `panic!` кладёт туда `&'static str` или `String`; всё остальное
/// заменяется заглушкой.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
