//! Fixed-content installer templates.
//!
//! Every script is joined with CRLF, the native line ending for `cmd.exe`,
//! `wscript` and `regedit`. Batch files stay ASCII-only so they print
//! correctly under any console code page.

use crate::{SetupParams, LAUNCHER_FILE_NAME, REGISTRY_FILE_NAME};

fn crlf(lines: &[&str]) -> String {
    lines.join("\r\n")
}

/// VBScript launcher registered as the protocol handler.
///
/// Receives the full `<protocol>://login?id=..&pw=..` URL as its first
/// argument, decodes both values, opens Internet Explorer on the target page
/// and submits the login form.
pub fn launcher_vbs(params: &SetupParams) -> String {
    let navigate = format!("IE.Navigate \"{}\"", params.target_url);
    crlf(&[
        "' Scanner - IE Auto Login Launcher",
        "' Called via custom protocol handler",
        "",
        "On Error Resume Next",
        "",
        "Dim url, id, pw",
        "",
        "url = WScript.Arguments(0)",
        "",
        "Dim queryStr",
        "If InStr(url, \"?\") > 0 Then",
        "    queryStr = Mid(url, InStr(url, \"?\") + 1)",
        "    If Right(queryStr, 1) = \"/\" Then queryStr = Left(queryStr, Len(queryStr) - 1)",
        "",
        "    Dim params, i",
        "    params = Split(queryStr, \"&\")",
        "    For i = 0 To UBound(params)",
        "        Dim kv",
        "        kv = Split(params(i), \"=\")",
        "        If UBound(kv) >= 1 Then",
        "            If LCase(kv(0)) = \"id\" Then id = kv(1)",
        "            If LCase(kv(0)) = \"pw\" Then pw = kv(1)",
        "        End If",
        "    Next",
        "End If",
        "",
        "Function URLDecode(s)",
        "    Dim result, j",
        "    result = \"\"",
        "    j = 1",
        "    Do While j <= Len(s)",
        "        If Mid(s, j, 1) = \"%\" And j + 2 <= Len(s) Then",
        "            result = result & Chr(CInt(\"&H\" & Mid(s, j + 1, 2)))",
        "            j = j + 3",
        "        ElseIf Mid(s, j, 1) = \"+\" Then",
        "            result = result & \" \"",
        "            j = j + 1",
        "        Else",
        "            result = result & Mid(s, j, 1)",
        "            j = j + 1",
        "        End If",
        "    Loop",
        "    URLDecode = result",
        "End Function",
        "",
        "id = URLDecode(id)",
        "pw = URLDecode(pw)",
        "",
        "If id = \"\" Or pw = \"\" Then",
        "    MsgBox \"ID or Password not provided.\", vbExclamation, \"Error\"",
        "    WScript.Quit",
        "End If",
        "",
        "Dim IE",
        "Set IE = CreateObject(\"InternetExplorer.Application\")",
        "IE.Visible = True",
        &navigate,
        "",
        "Do While IE.Busy Or IE.ReadyState <> 4",
        "    WScript.Sleep 500",
        "Loop",
        "",
        "WScript.Sleep 2000",
        "",
        "IE.Document.getElementById(\"username\").Value = id",
        "IE.Document.getElementById(\"password\").Value = pw",
        "IE.Document.getElementById(\"authUser\").Click",
        "",
        "If Err.Number <> 0 Then",
        "    MsgBox \"Auto login failed: \" & Err.Description, vbExclamation, \"Error\"",
        "    Err.Clear",
        "End If",
        "",
        "On Error GoTo 0",
        "Set IE = Nothing",
    ])
}

/// Registry import file binding `<protocol>://` to the launcher under HKCU.
pub fn registry_file(params: &SetupParams) -> String {
    let key = format!(r"HKEY_CURRENT_USER\Software\Classes\{}", params.protocol);
    // Backslashes inside a .reg string value are escaped by doubling.
    let launcher = format!(r"{}\{}", params.install_dir(), LAUNCHER_FILE_NAME).replace('\\', r"\\");
    let command = format!(r#"@="wscript \"{launcher}\" \"%1\"""#);

    let header = format!("[{key}]");
    let shell = format!(r"[{key}\shell]");
    let open = format!(r"[{key}\shell\open]");
    let cmd = format!(r"[{key}\shell\open\command]");

    crlf(&[
        "Windows Registry Editor Version 5.00",
        "",
        &header,
        r#"@="URL:Scanner Protocol""#,
        r#""URL Protocol"="""#,
        "",
        &shell,
        "",
        &open,
        "",
        &cmd,
        &command,
    ])
}

/// Batch script that copies the launcher and imports the registry file.
pub fn install_bat(params: &SetupParams) -> String {
    let dir = params.install_dir();
    let mkdir = format!("mkdir {dir} 2>nul");
    let copy = format!(r#"copy /Y "%~dp0{LAUNCHER_FILE_NAME}" {dir}\{LAUNCHER_FILE_NAME} >nul"#);
    let copied = format!("echo [OK] {LAUNCHER_FILE_NAME} copied to {dir}");
    let import = format!(r#"regedit /s "%~dp0{REGISTRY_FILE_NAME}""#);
    let registered = format!("echo [OK] {}:// protocol registered", params.protocol);

    crlf(&[
        "@echo off",
        "echo ============================================",
        "echo  Scanner - Protocol Handler Install",
        "echo ============================================",
        "echo.",
        "",
        &mkdir,
        &copy,
        &copied,
        "",
        &import,
        &registered,
        "",
        "echo.",
        "echo ============================================",
        "echo  Install complete!",
        "echo  Now run the login command again.",
        "echo ============================================",
        "echo.",
        "pause",
    ])
}

/// Batch script that removes the registry key and the launcher.
pub fn uninstall_bat(params: &SetupParams) -> String {
    let dir = params.install_dir();
    let delete_key = format!(r"reg delete HKCU\Software\Classes\{} /f >nul 2>&1", params.protocol);
    let removed = format!("echo [OK] {}:// protocol removed", params.protocol);
    let delete_file = format!(r"del /Q {dir}\{LAUNCHER_FILE_NAME} 2>nul");
    let deleted = format!("echo [OK] {LAUNCHER_FILE_NAME} deleted");

    crlf(&[
        "@echo off",
        "echo ============================================",
        "echo  Scanner - Protocol Handler Uninstall",
        "echo ============================================",
        "echo.",
        "",
        &delete_key,
        &removed,
        "",
        &delete_file,
        &deleted,
        "",
        "echo.",
        "echo  Uninstall complete!",
        "pause",
    ])
}
