use lazy_stmt_core::{Error, Result, Value};
use libsqlite3_sys::*;
use std::{
    ffi::{CStr, c_int},
    slice,
};

pub(crate) fn extract_value(statement: *mut sqlite3_stmt, index: c_int) -> Result<Value> {
    unsafe {
        let column_type = sqlite3_column_type(statement, index);
        Ok(match column_type {
            SQLITE_NULL => Value::Null,
            SQLITE_INTEGER => Value::Int64(Some(sqlite3_column_int64(statement, index))),
            SQLITE_FLOAT => Value::Float64(Some(sqlite3_column_double(statement, index))),
            SQLITE_BLOB => {
                let ptr = sqlite3_column_blob(statement, index) as *const u8;
                let len = sqlite3_column_bytes(statement, index) as usize;
                Value::Blob(Some(bytes(ptr, len).into()))
            }
            SQLITE_TEXT => {
                let ptr = sqlite3_column_text(statement, index);
                let len = sqlite3_column_bytes(statement, index) as usize;
                Value::Varchar(Some(String::from_utf8_lossy(bytes(ptr, len)).into_owned()))
            }
            _ => {
                return Err(Error::msg(format!(
                    "Unexpected column type {column_type}"
                )));
            }
        })
    }
}

pub(crate) fn extract_name(statement: *mut sqlite3_stmt, index: c_int) -> Result<String> {
    unsafe {
        let name = sqlite3_column_name(statement, index);
        if name.is_null() {
            return Err(Error::msg(format!("Could not read the name of column {index}")));
        }
        Ok(CStr::from_ptr(name).to_str()?.into())
    }
}

/// Name of the parameter at the one-based `index`, `None` for anonymous ones (`?`, `?NNN`).
pub(crate) fn parameter_name(statement: *mut sqlite3_stmt, index: c_int) -> Option<String> {
    unsafe {
        let name = sqlite3_bind_parameter_name(statement, index);
        if name.is_null() {
            return None;
        }
        let name = CStr::from_ptr(name).to_string_lossy();
        (!name.starts_with('?')).then(|| name.into_owned())
    }
}

/// Text the statement was prepared from.
pub(crate) fn statement_sql(statement: *mut sqlite3_stmt) -> String {
    unsafe {
        let sql = sqlite3_sql(statement);
        if sql.is_null() {
            return String::new();
        }
        CStr::from_ptr(sql).to_string_lossy().into_owned()
    }
}

unsafe fn bytes<'a>(ptr: *const u8, len: usize) -> &'a [u8] {
    if ptr.is_null() || len == 0 {
        return &[];
    }
    unsafe { slice::from_raw_parts(ptr, len) }
}
