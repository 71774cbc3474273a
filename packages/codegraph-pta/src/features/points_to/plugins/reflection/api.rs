//! Reflection API call sites recognized by the models

use crate::features::points_to::domain::MethodRef;

const FOR_NAME: &str = "<java.lang.Class: java.lang.Class forName(java.lang.String)>";
const FOR_NAME_LOADER: &str =
    "<java.lang.Class: java.lang.Class forName(java.lang.String,boolean,java.lang.ClassLoader)>";
const LOAD_CLASS: &str = "<java.lang.ClassLoader: java.lang.Class loadClass(java.lang.String)>";
const GET_CLASS_SUBSIG: &str = "java.lang.Class getClass()";
const GET_CONSTRUCTOR: &str =
    "<java.lang.Class: java.lang.reflect.Constructor getConstructor(java.lang.Class[])>";
const GET_DECLARED_CONSTRUCTOR: &str =
    "<java.lang.Class: java.lang.reflect.Constructor getDeclaredConstructor(java.lang.Class[])>";
const GET_METHOD: &str =
    "<java.lang.Class: java.lang.reflect.Method getMethod(java.lang.String,java.lang.Class[])>";
const GET_DECLARED_METHOD: &str =
    "<java.lang.Class: java.lang.reflect.Method getDeclaredMethod(java.lang.String,java.lang.Class[])>";
const CLASS_NEW_INSTANCE: &str = "<java.lang.Class: java.lang.Object newInstance()>";
const CONSTRUCTOR_NEW_INSTANCE: &str =
    "<java.lang.reflect.Constructor: java.lang.Object newInstance(java.lang.Object[])>";
const METHOD_INVOKE: &str =
    "<java.lang.reflect.Method: java.lang.Object invoke(java.lang.Object,java.lang.Object[])>";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Api {
    ForName,
    LoadClass,
    GetClass,
    GetConstructor,
    GetDeclaredConstructor,
    GetMethod,
    GetDeclaredMethod,
    ClassNewInstance,
    ConstructorNewInstance,
    MethodInvoke,
}

impl Api {
    /// Classify a call target; `getClass` matches on any receiver type
    pub fn classify(method_ref: &MethodRef) -> Option<Api> {
        if method_ref.subsignature() == GET_CLASS_SUBSIG {
            return Some(Api::GetClass);
        }
        let api = match method_ref.signature().as_str() {
            FOR_NAME | FOR_NAME_LOADER => Api::ForName,
            LOAD_CLASS => Api::LoadClass,
            GET_CONSTRUCTOR => Api::GetConstructor,
            GET_DECLARED_CONSTRUCTOR => Api::GetDeclaredConstructor,
            GET_METHOD => Api::GetMethod,
            GET_DECLARED_METHOD => Api::GetDeclaredMethod,
            CLASS_NEW_INSTANCE => Api::ClassNewInstance,
            CONSTRUCTOR_NEW_INSTANCE => Api::ConstructorNewInstance,
            METHOD_INVOKE => Api::MethodInvoke,
            _ => return None,
        };
        Some(api)
    }

    /// Name used in reflection logs
    pub fn log_name(&self) -> &'static str {
        match self {
            Api::ForName => "Class.forName",
            Api::LoadClass => "ClassLoader.loadClass",
            Api::GetClass => "Object.getClass",
            Api::GetConstructor => "Class.getConstructor",
            Api::GetDeclaredConstructor => "Class.getDeclaredConstructor",
            Api::GetMethod => "Class.getMethod",
            Api::GetDeclaredMethod => "Class.getDeclaredMethod",
            Api::ClassNewInstance => "Class.newInstance",
            Api::ConstructorNewInstance => "Constructor.newInstance",
            Api::MethodInvoke => "Method.invoke",
        }
    }

    pub fn from_log_name(name: &str) -> Option<Api> {
        match name {
            "Class.forName" => Some(Api::ForName),
            "Class.newInstance" => Some(Api::ClassNewInstance),
            "Constructor.newInstance" => Some(Api::ConstructorNewInstance),
            "Method.invoke" => Some(Api::MethodInvoke),
            _ => None,
        }
    }
}
