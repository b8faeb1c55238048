//! Scoped COM apartment for a single accessibility query.
//!
//! UI Automation needs COM initialised on whichever thread performs the
//! query.  [`ComScope`] pairs `CoInitializeEx` with `CoUninitialize` for the
//! lifetime of one query, so the apartment is released on every exit path,
//! including `?` returns and panics.
//!
//! The `PhantomData<*const ()>` field makes the scope `!Send` + `!Sync`: it
//! must be dropped on the thread that entered it.

use std::marker::PhantomData;

use crate::errors::SpyglassError;

/// RAII guard around the calling thread's COM apartment.
#[must_use = "ComScope must be held for the duration of the COM calls"]
pub struct ComScope {
    #[cfg_attr(not(windows), allow(dead_code))]
    balanced: bool,
    _thread_bound: PhantomData<*const ()>,
}

impl ComScope {
    /// Enter (or join) the thread's multithreaded apartment.
    ///
    /// `S_OK` and `S_FALSE` both require a balancing `CoUninitialize`.
    /// `RPC_E_CHANGED_MODE` means the thread already lives in an STA: COM is
    /// usable but this scope did not initialise anything, so it must not
    /// uninitialise either.
    #[cfg(windows)]
    pub fn enter() -> Result<Self, SpyglassError> {
        use windows::Win32::System::Com::{CoInitializeEx, COINIT_MULTITHREADED};

        let hr = unsafe { CoInitializeEx(None, COINIT_MULTITHREADED) };
        match hr.0 as u32 {
            0x0 | 0x1 => Ok(Self {
                balanced: true,
                _thread_bound: PhantomData,
            }),
            0x8001_0106 => {
                log::debug!("CoInitializeEx: RPC_E_CHANGED_MODE, reusing the thread's STA");
                Ok(Self {
                    balanced: false,
                    _thread_bound: PhantomData,
                })
            }
            code => Err(SpyglassError::ComError(format!(
                "CoInitializeEx failed: HRESULT 0x{code:08X}"
            ))),
        }
    }

    #[cfg(not(windows))]
    pub fn enter() -> Result<Self, SpyglassError> {
        Err(SpyglassError::Unsupported("COM"))
    }
}

impl Drop for ComScope {
    fn drop(&mut self) {
        #[cfg(windows)]
        if self.balanced {
            unsafe { windows::Win32::System::Com::CoUninitialize() };
        }
    }
}
