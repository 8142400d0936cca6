pub use enclose::enclose;

/// Builds a parameterless [`Relay`](crate::Relay), cloning the listed
/// captures into the action.
///
/// ```
/// use std::rc::Rc;
/// use viewtools::{relay, CommandManager, Observable, Requery};
///
/// let manager: Rc<dyn CommandManager> = Rc::new(Requery::new());
/// let full_screen = Observable::new(false);
/// let toggle = relay!(&manager, (full_screen) => {
///     full_screen.toggle().ok();
/// });
///
/// toggle.execute_with(&());
/// assert!(full_screen.get());
/// ```
#[macro_export]
macro_rules! relay {
    ($manager:expr, ( $($d_tt:tt)* ) => $($b:tt)*) => {
        $crate::Relay::<()>::new($manager, $crate::macros::enclose!(($( $d_tt )*) move |_: &()| { $($b)* }))
    };
    ($manager:expr, => $($b:tt)*) => {
        $crate::Relay::<()>::new($manager, move |_: &()| { $($b)* })
    };
}
