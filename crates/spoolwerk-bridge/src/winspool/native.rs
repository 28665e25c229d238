// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Win32 spooler calls via windows-sys.
//
// Variable-length results (printer and job info) use the two-call pattern:
// probe for the byte count, then fill a buffer of that size.  Buffers are
// `u64`-backed so the info structs read from them are aligned.

use std::ffi::c_void;
use std::ptr;

use tracing::{debug, instrument};
use windows_sys::Win32::Foundation::{GetLastError, SYSTEMTIME};
use windows_sys::Win32::Graphics::Gdi::DEVMODEW;
use windows_sys::Win32::Graphics::Printing::{
    ClosePrinter, DOC_INFO_1W, DocumentPropertiesW, EndDocPrinter, EndPagePrinter, EnumPrintersW,
    GetDefaultPrinterW, GetJobW, JOB_INFO_2W, OpenPrinterW, PRINTER_HANDLE, PRINTER_INFO_2W,
    SetJobW, StartDocPrinterW, StartPagePrinter, WritePrinter,
};

use spoolwerk_core::error::{Result, SpoolwerkError};
use spoolwerk_core::types::JobCommand;

use super::api::{DevModeInfo, JobInfo, PrinterInfo, Spooler, SpoolerPrinter, SystemTime};

const PRINTER_ENUM_LOCAL: u32 = 0x0000_0002;
const PRINTER_ENUM_CONNECTIONS: u32 = 0x0000_0004;

const JOB_CONTROL_PAUSE: u32 = 1;
const JOB_CONTROL_RESUME: u32 = 2;
const JOB_CONTROL_CANCEL: u32 = 3;

const DM_OUT_BUFFER: u32 = 2;
const DM_PAPERSIZE: u32 = 0x0000_0002;
const DM_FORMNAME: u32 = 0x0001_0000;
const IDOK: i32 = 1;

const ERROR_INVALID_PARAMETER: u32 = 87;

fn last_error(call: &'static str) -> SpoolwerkError {
    // SAFETY: reads thread-local error state only.
    let code = unsafe { GetLastError() };
    SpoolwerkError::Spooler { call, code }
}

/// NUL-terminated UTF-16 copy of `s`.
fn to_wide(s: &str) -> Result<Vec<u16>> {
    if s.contains('\0') {
        return Err(SpoolwerkError::InvalidName(s.to_string()));
    }
    Ok(s.encode_utf16().chain(std::iter::once(0)).collect())
}

/// Lossy UTF-8 copy of a NUL-terminated UTF-16 string; null gives "".
///
/// # Safety
/// `p` must be null or point to a NUL-terminated UTF-16 string.
unsafe fn from_wide(p: *const u16) -> String {
    if p.is_null() {
        return String::new();
    }
    let mut len = 0;
    // SAFETY: caller guarantees termination.
    unsafe {
        while *p.add(len) != 0 {
            len += 1;
        }
        String::from_utf16_lossy(std::slice::from_raw_parts(p, len))
    }
}

fn from_wide_array(chars: &[u16]) -> String {
    let len = chars.iter().position(|&c| c == 0).unwrap_or(chars.len());
    String::from_utf16_lossy(&chars[..len])
}

/// Zeroed buffer of at least `bytes` bytes, 8-byte aligned.
fn aligned_buffer(bytes: u32) -> Vec<u64> {
    vec![0u64; (bytes as usize).div_ceil(8)]
}

fn system_time(st: &SYSTEMTIME) -> SystemTime {
    SystemTime {
        year: st.wYear,
        month: st.wMonth,
        day: st.wDay,
        hour: st.wHour,
        minute: st.wMinute,
        second: st.wSecond,
        milliseconds: st.wMilliseconds,
    }
}

/// The local Win32 spooler.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeSpooler;

impl Spooler for NativeSpooler {
    type Printer = NativePrinter;

    #[instrument(skip(self))]
    fn enum_printers(&self) -> Result<Vec<PrinterInfo>> {
        let flags = PRINTER_ENUM_LOCAL | PRINTER_ENUM_CONNECTIONS;
        let mut needed = 0u32;
        let mut returned = 0u32;
        // SAFETY: size probe with a null buffer.
        unsafe {
            EnumPrintersW(flags, ptr::null(), 2, ptr::null_mut(), 0, &mut needed, &mut returned);
        }
        if needed == 0 {
            return Ok(Vec::new());
        }

        let mut buffer = aligned_buffer(needed);
        // SAFETY: buffer holds at least `needed` bytes.
        let ok = unsafe {
            EnumPrintersW(
                flags,
                ptr::null(),
                2,
                buffer.as_mut_ptr().cast(),
                needed,
                &mut needed,
                &mut returned,
            )
        };
        if ok == 0 {
            return Err(last_error("EnumPrintersW"));
        }

        let infos = buffer.as_ptr().cast::<PRINTER_INFO_2W>();
        let printers = (0..returned as usize)
            .map(|i| {
                // SAFETY: the spooler wrote `returned` level-2 records whose
                // strings point into the same buffer.
                unsafe {
                    let info = &*infos.add(i);
                    PrinterInfo {
                        name: from_wide(info.pPrinterName),
                        location: from_wide(info.pLocation),
                        comment: from_wide(info.pComment),
                        driver: from_wide(info.pDriverName),
                        port: from_wide(info.pPortName),
                    }
                }
            })
            .collect::<Vec<_>>();
        debug!(count = printers.len(), "enumerated printers");
        Ok(printers)
    }

    fn default_printer(&self) -> Result<Option<String>> {
        let mut size = 0u32;
        // SAFETY: size probe with a null buffer.
        unsafe {
            GetDefaultPrinterW(ptr::null_mut(), &mut size);
        }
        if size == 0 {
            return Ok(None);
        }
        let mut name = vec![0u16; size as usize];
        // SAFETY: `name` holds `size` UTF-16 units.
        if unsafe { GetDefaultPrinterW(name.as_mut_ptr(), &mut size) } == 0 {
            return Err(last_error("GetDefaultPrinterW"));
        }
        Ok(Some(from_wide_array(&name)).filter(|n| !n.is_empty()))
    }

    fn open_printer(&self, name: &str) -> Result<NativePrinter> {
        let wide = to_wide(name)?;
        // SAFETY: an all-zero handle is the documented "no handle" value.
        let mut handle: PRINTER_HANDLE = unsafe { std::mem::zeroed() };
        // SAFETY: `wide` is NUL-terminated and outlives the call.
        if unsafe { OpenPrinterW(wide.as_ptr(), &mut handle, ptr::null()) } == 0 {
            return Err(last_error("OpenPrinterW"));
        }
        Ok(NativePrinter { handle, name: wide })
    }
}

/// An open printer handle, closed on drop.
pub struct NativePrinter {
    handle: PRINTER_HANDLE,
    name: Vec<u16>,
}

impl NativePrinter {
    fn check(ok: i32, call: &'static str) -> Result<()> {
        if ok == 0 {
            return Err(last_error(call));
        }
        Ok(())
    }
}

impl SpoolerPrinter for NativePrinter {
    fn start_doc(&mut self, doc_name: &str, datatype: &str) -> Result<u32> {
        let mut doc_name = to_wide(doc_name)?;
        let mut datatype = to_wide(datatype)?;
        let info = DOC_INFO_1W {
            pDocName: doc_name.as_mut_ptr(),
            pOutputFile: ptr::null_mut(),
            pDatatype: datatype.as_mut_ptr(),
        };
        // SAFETY: `info` and the strings it points to outlive the call.
        let job_id = unsafe { StartDocPrinterW(self.handle, 1, &info as *const DOC_INFO_1W as _) };
        if job_id == 0 {
            return Err(last_error("StartDocPrinterW"));
        }
        Ok(job_id)
    }

    fn end_doc(&mut self) -> Result<()> {
        // SAFETY: handle is open.
        Self::check(unsafe { EndDocPrinter(self.handle) }, "EndDocPrinter")
    }

    fn start_page(&mut self) -> Result<()> {
        // SAFETY: handle is open.
        Self::check(unsafe { StartPagePrinter(self.handle) }, "StartPagePrinter")
    }

    fn end_page(&mut self) -> Result<()> {
        // SAFETY: handle is open.
        Self::check(unsafe { EndPagePrinter(self.handle) }, "EndPagePrinter")
    }

    fn write(&mut self, data: &[u8]) -> Result<u32> {
        let len = u32::try_from(data.len()).map_err(|_| SpoolwerkError::Spooler {
            call: "WritePrinter",
            code: ERROR_INVALID_PARAMETER,
        })?;
        let mut written = 0u32;
        // SAFETY: `data` is valid for `len` bytes.
        let ok = unsafe {
            WritePrinter(self.handle, data.as_ptr().cast::<c_void>(), len, &mut written)
        };
        Self::check(ok, "WritePrinter")?;
        Ok(written)
    }

    #[instrument(skip(self))]
    fn document_properties(&mut self) -> Result<DevModeInfo> {
        // SAFETY: size probe; null HWND and buffers.
        let size = unsafe {
            DocumentPropertiesW(
                std::mem::zeroed(),
                self.handle,
                self.name.as_ptr(),
                ptr::null_mut(),
                ptr::null(),
                0,
            )
        };
        if size <= 0 {
            return Err(last_error("DocumentPropertiesW"));
        }

        let mut buffer = aligned_buffer(size as u32);
        let devmode = buffer.as_mut_ptr().cast::<DEVMODEW>();
        // SAFETY: buffer holds the `size` bytes the driver asked for.
        let result = unsafe {
            DocumentPropertiesW(
                std::mem::zeroed(),
                self.handle,
                self.name.as_ptr(),
                devmode,
                ptr::null(),
                DM_OUT_BUFFER as _,
            )
        };
        if result != IDOK {
            return Err(last_error("DocumentPropertiesW"));
        }

        // SAFETY: the driver filled a DEVMODEW at the start of the buffer;
        // the paper-size union arm is the printer one.
        let (fields, form, paper) = unsafe {
            let dm = &*devmode;
            (
                dm.dmFields as u32,
                from_wide_array(&dm.dmFormName),
                dm.Anonymous1.Anonymous1.dmPaperSize,
            )
        };
        Ok(DevModeInfo {
            form_name: (fields & DM_FORMNAME != 0).then_some(form),
            paper_size: (fields & DM_PAPERSIZE != 0).then_some(paper),
        })
    }

    fn job(&mut self, job_id: u32) -> Result<Option<JobInfo>> {
        let mut needed = 0u32;
        // SAFETY: size probe with a null buffer.
        unsafe {
            GetJobW(self.handle, job_id, 2, ptr::null_mut(), 0, &mut needed);
        }
        if needed == 0 {
            return Ok(None);
        }

        let mut buffer = aligned_buffer(needed);
        // SAFETY: buffer holds at least `needed` bytes.
        let ok = unsafe {
            GetJobW(self.handle, job_id, 2, buffer.as_mut_ptr().cast(), needed, &mut needed)
        };
        if ok == 0 {
            return Err(last_error("GetJobW"));
        }

        // SAFETY: the spooler wrote one JOB_INFO_2W whose strings point into
        // the same buffer.
        let info = unsafe {
            let job = &*buffer.as_ptr().cast::<JOB_INFO_2W>();
            JobInfo {
                document: from_wide(job.pDocument),
                user: from_wide(job.pUserName),
                priority: job.Priority,
                size: job.Size,
                status: job.Status,
                submitted: system_time(&job.Submitted),
            }
        };
        Ok(Some(info))
    }

    fn control_job(&mut self, job_id: u32, command: JobCommand) -> Result<()> {
        let control = match command {
            JobCommand::Cancel => JOB_CONTROL_CANCEL,
            JobCommand::Pause => JOB_CONTROL_PAUSE,
            JobCommand::Resume => JOB_CONTROL_RESUME,
        };
        // SAFETY: level 0 takes no job structure.
        let ok = unsafe { SetJobW(self.handle, job_id, 0, ptr::null(), control as _) };
        Self::check(ok, "SetJobW")
    }
}

impl Drop for NativePrinter {
    fn drop(&mut self) {
        // SAFETY: handle came from a successful OpenPrinterW and is closed
        // exactly once.
        unsafe {
            ClosePrinter(self.handle);
        }
    }
}
