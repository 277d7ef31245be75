// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! Default deserialization-gadget blacklist: names `CodecSelector`'s
//! security gate refuses to resolve unless the caller explicitly registers
//! them. These are names of types known, across the object-serialization
//! ecosystem generally, to chain into arbitrary code execution when an
//! attacker controls the serialized bytes — not specific to any one
//! language runtime, since the wire is shared cross-language.

use std::collections::HashSet;

pub struct BlackList {
    names: HashSet<&'static str>,
}

impl Default for BlackList {
    fn default() -> BlackList {
        BlackList {
            names: DEFAULT_BLACKLIST.iter().copied().collect(),
        }
    }
}

impl BlackList {
    pub fn new() -> BlackList {
        BlackList::default()
    }

    pub fn empty() -> BlackList {
        BlackList {
            names: HashSet::new(),
        }
    }

    pub fn contains(&self, qualified_name: &str) -> bool {
        self.names.contains(qualified_name)
    }

    pub fn add(&mut self, qualified_name: &'static str) {
        self.names.insert(qualified_name);
    }

    pub fn remove(&mut self, qualified_name: &str) {
        self.names.remove(qualified_name);
    }
}

const DEFAULT_BLACKLIST: &[&str] = &[
    "org.apache.commons.collections.functors.InvokerTransformer",
    "org.apache.commons.collections.functors.InstantiateTransformer",
    "org.apache.commons.collections4.functors.InvokerTransformer",
    "org.apache.commons.collections4.functors.InstantiateTransformer",
    "org.apache.commons.collections4.comparators.TransformingComparator",
    "org.apache.commons.collections.comparators.TransformingComparator",
    "org.codehaus.groovy.runtime.ConvertedClosure",
    "org.codehaus.groovy.runtime.MethodClosure",
    "org.springframework.beans.factory.ObjectFactory",
    "com.sun.org.apache.xalan.internal.xsltc.trax.TemplatesImpl",
    "javax.management.BadAttributeValueExpException",
    "java.rmi.server.UnicastRemoteObject",
    "java.lang.ProcessBuilder",
    "java.lang.Runtime",
];
