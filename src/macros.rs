// -- macros.rs --

#![allow(unused_macros)]

// --

macro_rules! cfg_harness {
    ($($item:item)*) => {
        $(
            #[cfg(feature = "harness")]
            #[cfg_attr(docsrs, doc(cfg(feature = "harness")))]
            $item
        )*
    }
}

#[cfg(test)]
macro_rules! init_test_log {
    () => {
        let _ = env_logger::builder().is_test(true).try_init();
    };
}
